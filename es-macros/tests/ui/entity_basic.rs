use es_domain::entity::Entity;
use es_domain::value_object::{AggregateId, Version};
use es_macros::{domain_event, entity};

#[domain_event]
enum LampEvent {
    SwitchedOn,
    SwitchedOff,
}

#[entity(event = LampEvent)]
#[derive(Clone)]
struct Lamp {
    on: bool,
}

fn main() {
    let id = AggregateId::new();
    let mut lamp = Lamp::rehydrate(id, Version::from_value(3));
    assert_eq!(lamp.id(), &id);
    assert_eq!(lamp.version().value(), 3);
    assert!(!lamp.on);

    lamp.uncommitted_mut().push(LampEvent::SwitchedOn);
    assert_eq!(lamp.uncommitted().len(), 1);

    let copy = lamp.clone();
    assert_eq!(copy.uncommitted().len(), 1);
}
