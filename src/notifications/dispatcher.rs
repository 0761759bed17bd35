use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{
    AlwaysSubscribed, Delivery, ErrorReporter, Notification, Notifier, Recipient,
    SubscriptionCheck, TracingErrorReporter, UserDirectory,
};
use crate::config::{NotificationConfig, SiteConfig};
use crate::observability::lifecycle_metrics;
use crate::user::User;

/// Fire-and-forget delivery of notifications queued by committed transitions.
///
/// Each `dispatch` call runs on its own tokio task. Delivery failures are
/// logged and handed to the [`ErrorReporter`]; they never reach the caller.
pub struct NotificationDispatcher {
    inner: Arc<DispatchInner>,
    enabled: bool,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

struct DispatchInner {
    notifier: Arc<dyn Notifier>,
    users: Arc<dyn UserDirectory>,
    subscriptions: Arc<dyn SubscriptionCheck>,
    reporter: Arc<dyn ErrorReporter>,
    site: SiteConfig,
}

impl NotificationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, users: Arc<dyn UserDirectory>, site: SiteConfig) -> Self {
        Self {
            inner: Arc::new(DispatchInner {
                notifier,
                users,
                subscriptions: Arc::new(AlwaysSubscribed),
                reporter: Arc::new(TracingErrorReporter),
                site,
            }),
            enabled: true,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn with_subscriptions(mut self, subscriptions: Arc<dyn SubscriptionCheck>) -> Self {
        self.update_inner(|inner| inner.subscriptions = subscriptions);
        self
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn ErrorReporter>) -> Self {
        self.update_inner(|inner| inner.reporter = reporter);
        self
    }

    pub fn with_config(mut self, config: &NotificationConfig) -> Self {
        self.enabled = config.enabled;
        self
    }

    fn update_inner(&mut self, apply: impl FnOnce(&mut DispatchInner)) {
        let current = &self.inner;
        let mut next = DispatchInner {
            notifier: Arc::clone(&current.notifier),
            users: Arc::clone(&current.users),
            subscriptions: Arc::clone(&current.subscriptions),
            reporter: Arc::clone(&current.reporter),
            site: current.site.clone(),
        };
        apply(&mut next);
        self.inner = Arc::new(next);
    }

    /// Queue notifications for background delivery. Never fails.
    pub async fn dispatch(&self, notifications: Vec<Notification>) {
        if notifications.is_empty() {
            return;
        }
        if !self.enabled {
            debug!(count = notifications.len(), "Notifications disabled, dropping");
            return;
        }

        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(async move {
            for notification in notifications {
                inner.deliver(notification).await;
            }
        });

        let mut pending = self.pending.lock().await;
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for every queued delivery to finish.
    pub async fn flush(&self) {
        let handles: Vec<_> = self.pending.lock().await.drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Notification task aborted");
            }
        }
    }
}

impl DispatchInner {
    async fn deliver(&self, notification: Notification) {
        let event_type = notification.event.event_type();
        let recipients = match self.resolve(&notification.recipient).await {
            Ok(recipients) => recipients,
            Err(e) => {
                lifecycle_metrics().record_failed();
                self.reporter.report(&e, event_type);
                return;
            }
        };

        for (to, user) in recipients {
            if let (Some(user), Some(subscription)) = (&user, notification.event.subscription()) {
                if !self.subscriptions.is_subscribed(user, subscription) {
                    debug!(
                        to = %to,
                        event_type,
                        "Ignoring notification because user is unsubscribed"
                    );
                    lifecycle_metrics().record_skipped();
                    continue;
                }
            }

            let mut context = notification.context.clone();
            if let Some(link) = &context.link {
                context.url = Some(link.resolve(&self.site, user.as_ref()));
            }

            let delivery = Delivery {
                to,
                event_type,
                user,
                context,
            };
            match self.notifier.notify(delivery).await {
                Ok(()) => lifecycle_metrics().record_sent(),
                Err(e) => {
                    lifecycle_metrics().record_failed();
                    self.reporter.report(&e, event_type);
                }
            }
        }
    }

    async fn resolve(&self, recipient: &Recipient) -> anyhow::Result<Vec<(String, Option<User>)>> {
        let resolved = match recipient {
            Recipient::Admins => self
                .users
                .admins()
                .await?
                .into_iter()
                .map(|admin| (admin.email_address.clone(), Some(admin)))
                .collect(),
            Recipient::User(user) => vec![(user.email_address.clone(), Some(user.clone()))],
            Recipient::UserId(id) => match self.users.find_user(*id).await? {
                Some(user) => vec![(user.email_address.clone(), Some(user))],
                None => anyhow::bail!("No user with id {} to notify", id),
            },
            Recipient::Address(address) => match self.users.find_by_email(address).await? {
                Some(user) => vec![(user.email_address.clone(), Some(user))],
                None => vec![(address.clone(), None)],
            },
        };
        Ok(resolved)
    }
}
