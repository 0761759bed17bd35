use crate::history::HistoryDraft;
use crate::notifications::{Notification, NotificationContext, NotificationEvent, Recipient};

/// Side effects collected while a transition mutates an aggregate.
///
/// History drafts are committed in the same unit of work as the aggregate.
/// Notifications are handed to the dispatcher only after that commit succeeds.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TransitionEffects {
    pub history: Vec<HistoryDraft>,
    pub notifications: Vec<Notification>,
}

impl TransitionEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, draft: HistoryDraft) {
        self.history.push(draft);
    }

    pub fn notify(&mut self, event: NotificationEvent, recipient: Recipient, context: NotificationContext) {
        self.notifications.push(Notification {
            event,
            recipient,
            context,
        });
    }

    /// Same event and context to several recipients.
    pub fn notify_each(
        &mut self,
        event: NotificationEvent,
        recipients: impl IntoIterator<Item = Recipient>,
        context: &NotificationContext,
    ) {
        for recipient in recipients {
            self.notify(event, recipient, context.clone());
        }
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.notifications.iter().map(|n| n.event).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.notifications.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::user::User;

    #[test]
    fn test_notify_each_clones_context() {
        let mut effects = TransitionEffects::new();
        let team = vec![
            User::new(100_001, "a", "a@example.com"),
            User::new(100_002, "b", "b@example.com"),
        ];
        effects.notify_each(
            NotificationEvent::ProposalCanceled,
            team.into_iter().map(Recipient::User),
            &NotificationContext::proposal(200_000, "Wallet"),
        );
        assert_eq!(effects.notifications.len(), 2);
        assert_eq!(
            effects.events(),
            vec![NotificationEvent::ProposalCanceled, NotificationEvent::ProposalCanceled]
        );
        assert!(!effects.is_empty());
    }
}
