use flowdesk_types::{NOTIFICATION_CHANNELS, NOTIFICATION_EVENTS, NotificationRule};

/// One change to a notification rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleEdit {
    Event(String),
    NotifyRoles(Vec<String>),
    Channels(Vec<String>),
}

/// Ordered notification rules of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationRules {
    rules: Vec<NotificationRule>,
}

impl NotificationRules {
    pub fn new(rules: Vec<NotificationRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[NotificationRule] {
        &self.rules
    }

    pub fn into_rules(self) -> Vec<NotificationRule> {
        self.rules
    }

    /// Append a rule for the first event, no roles, email delivery.
    pub fn add_rule(&mut self) -> usize {
        self.rules.push(NotificationRule::default());
        self.rules.len() - 1
    }

    pub fn remove_rule(&mut self, index: usize) -> Option<NotificationRule> {
        (index < self.rules.len()).then(|| self.rules.remove(index))
    }

    /// Apply an edit. Unknown events are rejected and unknown channels dropped.
    pub fn update_rule(&mut self, index: usize, edit: RuleEdit) -> bool {
        let Some(rule) = self.rules.get_mut(index) else {
            return false;
        };
        match edit {
            RuleEdit::Event(event) => {
                if !NOTIFICATION_EVENTS.contains(&event.as_str()) {
                    return false;
                }
                rule.event = event;
            }
            RuleEdit::NotifyRoles(roles) => rule.notify_roles = roles,
            RuleEdit::Channels(channels) => {
                rule.channels = channels
                    .into_iter()
                    .filter(|channel| NOTIFICATION_CHANNELS.contains(&channel.as_str()))
                    .collect();
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_update_remove() {
        let mut rules = NotificationRules::default();
        let index = rules.add_rule();
        assert_eq!(rules.rules()[index].event, "step_started");
        assert_eq!(rules.rules()[index].channels, vec!["email".to_string()]);

        assert!(rules.update_rule(index, RuleEdit::Event("ticket_completed".into())));
        assert!(!rules.update_rule(index, RuleEdit::Event("lunch_time".into())));
        assert!(rules.update_rule(index, RuleEdit::Channels(vec!["slack".into(), "pager".into()])));
        assert!(rules.update_rule(index, RuleEdit::NotifyRoles(vec!["manager".into()])));

        let rule = &rules.rules()[index];
        assert_eq!(rule.event, "ticket_completed");
        assert_eq!(rule.channels, vec!["slack".to_string()]);
        assert_eq!(rule.notify_roles, vec!["manager".to_string()]);

        assert!(rules.remove_rule(index).is_some());
        assert!(rules.remove_rule(index).is_none());
        assert!(!rules.update_rule(0, RuleEdit::NotifyRoles(Vec::new())));
    }
}
