// ── Household model ──
//
// Who is tracked, where they can be, and who should hear about it.
// Built by the config layer; core never reads files.

use indexmap::IndexMap;

/// A tracked person, keyed by Home Assistant entity id (`person.alice`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    /// Display name used in messages.
    pub name: String,
    /// Mobile-app device suffix for `notify.mobile_app_<device>`.
    /// People without one are tracked but never notified.
    pub notification_device: Option<String>,
}

/// A named zone, keyed by the state string Home Assistant reports
/// for a person inside it (`home`, or the zone name).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub name: String,
    /// Entity id of the person this location belongs to.
    pub owner: Option<String>,
    /// Possessive prefix shown to everyone but the owner, e.g. `"Bob's"`.
    pub owner_name: Option<String>,
}

impl Location {
    /// How this location is described when `mover` enters or leaves it.
    pub fn label_for(&self, mover: &str) -> String {
        match (&self.owner, &self.owner_name) {
            (Some(owner), Some(owner_name)) if owner != mover => {
                format!("{owner_name} {}", self.name)
            }
            _ => self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Household {
    pub people: IndexMap<String, Person>,
    pub locations: IndexMap<String, Location>,
}

impl Household {
    pub fn person(&self, entity_id: &str) -> Option<&Person> {
        self.people.get(entity_id)
    }

    pub fn location(&self, state: &str) -> Option<&Location> {
        self.locations.get(state)
    }

    /// Devices of everyone except `mover`, in configuration order.
    pub fn recipients_except<'a>(&'a self, mover: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.people
            .iter()
            .filter(move |(id, _)| id.as_str() != mover)
            .filter_map(|(_, person)| person.notification_device.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work() -> Location {
        Location {
            name: "work".into(),
            owner: Some("person.bob".into()),
            owner_name: Some("Bob's".into()),
        }
    }

    #[test]
    fn owned_location_is_possessive_for_others() {
        assert_eq!(work().label_for("person.alice"), "Bob's work");
    }

    #[test]
    fn owned_location_is_plain_for_owner() {
        assert_eq!(work().label_for("person.bob"), "work");
    }

    #[test]
    fn owner_without_display_name_falls_back_to_name() {
        let loc = Location {
            owner_name: None,
            ..work()
        };
        assert_eq!(loc.label_for("person.alice"), "work");
    }

    #[test]
    fn recipients_skip_mover_and_deviceless_people() {
        let mut household = Household::default();
        for (id, name, device) in [
            ("person.alice", "Alice", Some("alice_phone")),
            ("person.bob", "Bob", Some("bob_phone")),
            ("person.carol", "Carol", None),
        ] {
            household.people.insert(
                id.into(),
                Person {
                    name: name.into(),
                    notification_device: device.map(String::from),
                },
            );
        }

        let recipients: Vec<_> = household.recipients_except("person.alice").collect();
        assert_eq!(recipients, vec!["bob_phone"]);
    }
}
