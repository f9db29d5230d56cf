//! Message disposition notifications (spec §4.F disposition, RFC-3798):
//! `action-mode/sending-mode; type[/modifier...]`.

/// The left half of a disposition value, `action-mode/sending-mode`, kept
/// as strings since RFC-3798 leaves both open to extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispositionActionMode {
    pub action_mode: String,
    pub sending_mode: String,
}

/// The right half, `type[/modifier...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispositionType {
    pub disposition_type: String,
    pub modifiers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disposition {
    pub action_mode: DispositionActionMode,
    pub disposition_type: DispositionType,
}

impl Disposition {
    pub fn new(
        action_mode: impl Into<String>,
        sending_mode: impl Into<String>,
        disposition_type: impl Into<String>,
    ) -> Self {
        Self {
            action_mode: DispositionActionMode {
                action_mode: action_mode.into(),
                sending_mode: sending_mode.into(),
            },
            disposition_type: DispositionType {
                disposition_type: disposition_type.into(),
                modifiers: Vec::new(),
            },
        }
    }

    pub fn with_modifier(mut self, modifier: impl Into<String>) -> Self {
        self.disposition_type.modifiers.push(modifier.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructs_with_no_modifiers_by_default() {
        let d = Disposition::new("manual", "MDN-sent-manually", "displayed");
        assert!(d.disposition_type.modifiers.is_empty());
        assert_eq!(d.action_mode.action_mode, "manual");
    }
}
