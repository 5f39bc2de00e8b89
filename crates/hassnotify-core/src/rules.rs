// ── Notification rules ──
//
// Pure evaluation of one `StateChange` against the household. No I/O here;
// the notifier loop owns delivery.

use hassnotify_api::{NotificationOptions, StateChange};

use crate::model::Household;
use crate::template::{Templates, render};

pub const DEFAULT_CHANNEL: &str = "Location";
pub const DEFAULT_GROUP: &str = "location";

/// Everything needed to turn location changes into push notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifierConfig {
    pub household: Household,
    pub templates: Templates,
    /// Android notification channel.
    pub channel: String,
    /// Notification group shown on the device.
    pub group: String,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            household: Household::default(),
            templates: Templates::default(),
            channel: DEFAULT_CHANNEL.into(),
            group: DEFAULT_GROUP.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    Left,
    Arrived,
}

impl std::fmt::Display for Movement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Left => f.write_str("left"),
            Self::Arrived => f.write_str("arrived"),
        }
    }
}

/// A notification ready to hand to `HassClient::send_notification`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outgoing {
    pub movement: Movement,
    pub device: String,
    pub title: String,
    pub body: String,
    pub options: NotificationOptions,
}

impl NotifierConfig {
    /// Notifications for one state change, *left* before *arrived*,
    /// recipients in configuration order.
    pub fn evaluate(&self, change: &StateChange) -> Vec<Outgoing> {
        let Some(person) = self.household.person(&change.entity_id) else {
            return Vec::new();
        };
        if change.old_state == change.new_state {
            return Vec::new();
        }

        let mover = change.entity_id.as_str();
        let options = NotificationOptions {
            tag: Some(format!("location-{mover}")),
            group: Some(self.group.clone()),
            channel: Some(self.channel.clone()),
        };

        let sides = [
            (Movement::Left, &change.old_state),
            (Movement::Arrived, &change.new_state),
        ];

        let mut out = Vec::new();
        for (movement, state) in sides {
            let Some(location) = self.household.location(state) else {
                continue;
            };
            let label = location.label_for(mover);
            let vars = [("person", person.name.as_str()), ("location", label.as_str())];
            let (title, body) = match movement {
                Movement::Left => (&self.templates.left_title, &self.templates.left_body),
                Movement::Arrived => (&self.templates.arrived_title, &self.templates.arrived_body),
            };
            let title = render(title, &vars);
            let body = render(body, &vars);

            for device in self.household.recipients_except(mover) {
                out.push(Outgoing {
                    movement,
                    device: device.to_owned(),
                    title: title.clone(),
                    body: body.clone(),
                    options: options.clone(),
                });
            }
        }
        out
    }
}
