use es_domain::domain_event::DomainEvent;
use es_macros::domain_event;

#[domain_event(version = 1)]
enum BankEvent {
    #[event(event_type = "bank.opened")]
    Opened { name: String },
    #[event(event_type = "bank.renamed", event_version = 2)]
    Renamed { to: String },
    Closed,
    Audited(u32),
}

fn main() {
    assert_eq!(
        BankEvent::EVENT_TYPES,
        &["bank.opened", "bank.renamed", "BankEvent.Closed", "BankEvent.Audited"]
    );

    let opened = BankEvent::Opened { name: "a".into() };
    assert_eq!(opened.event_type(), "bank.opened");
    assert_eq!(opened.event_version(), 1);

    let renamed = BankEvent::Renamed { to: "b".into() };
    assert_eq!(renamed.event_version(), 2);

    assert_eq!(BankEvent::Closed.event_type(), "BankEvent.Closed");
    assert_eq!(BankEvent::Audited(1).event_type(), "BankEvent.Audited");
    assert_eq!(renamed.clone(), renamed);
}
