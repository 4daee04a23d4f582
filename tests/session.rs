mod common;

use std::rc::Rc;

use common::*;
use v4l2ucp::control::{Flags, Type, Value};
use v4l2ucp::enumerate::{Descriptors, Protocol};
use v4l2ucp::object::{Control, Item, UNKNOWN_MENU_VALUE};
use v4l2ucp::v4l_sys::{V4L2_CID_BASE, V4L2_CID_PRIVATE_BASE};
use v4l2ucp::{Error, Session};

fn session(dev: &Rc<MockDevice>) -> Session {
    Session::with_handle(Rc::clone(dev) as Rc<dyn v4l2ucp::Handle>, "/dev/mock0").unwrap()
}

fn three_controls() -> Rc<MockDevice> {
    Rc::new(
        MockDevice::new()
            .with(integer(1, 0, 10, 2, 4))
            .with(boolean(2, 1))
            .with(button(3)),
    )
}

#[test]
fn enumerates_integer_boolean_button_in_order() {
    let dev = three_controls();
    let session = session(&dev);

    let kinds: Vec<(u32, Type)> = session
        .controls()
        .map(|c| (c.id(), c.description().typ))
        .collect();
    assert_eq!(
        kinds,
        vec![(1, Type::Integer), (2, Type::Boolean), (3, Type::Button)]
    );
    assert_eq!(session.protocol(), Some(Protocol::Extended));
    assert_eq!(session.capabilities().driver, "mock");
}

#[test]
fn apply_snaps_then_reset_restores_default() {
    let dev = three_controls();
    let mut session = session(&dev);

    session.apply(1, 7).unwrap();
    assert_eq!(dev.stored(1), Some(8));
    assert_eq!(session.control(1).unwrap().value(), Value::Integer(8));

    session.reset(1).unwrap();
    session.refresh(1).unwrap();
    assert_eq!(session.control(1).unwrap().value(), Value::Integer(4));
}

#[test]
fn reset_all_leaves_buttons_alone() {
    let dev = three_controls();
    let mut session = session(&dev);
    session.apply(1, 10).unwrap();
    session.apply(2, 0).unwrap();
    dev.clear_sets();

    let pass = session.reset_all();

    assert!(pass.is_clean());
    assert_eq!(pass.done, vec![1, 2]);
    assert_eq!(dev.sets(), vec![(1, 4), (2, 1)]);
    assert!(dev.sets().iter().all(|(id, _)| *id != 3));
}

#[test]
fn protocol_choice_is_invisible_in_descriptors() {
    let build = |dev: MockDevice| {
        dev.with(integer(V4L2_CID_BASE, 0, 255, 1, 128))
            .with(boolean(V4L2_CID_BASE + 3, 0))
            .with(with_flags(integer(V4L2_CID_BASE + 5, 0, 1, 1, 0), Flags::DISABLED))
            .with(menu(V4L2_CID_BASE + 24, 0, 2, 1))
            .with(integer(V4L2_CID_PRIVATE_BASE, -10, 10, 1, 0))
            .with(button(V4L2_CID_PRIVATE_BASE + 1))
    };
    let extended = build(MockDevice::new());
    let legacy = build(MockDevice::legacy());

    let mut via_extended = Descriptors::new(&extended);
    let a: Vec<_> = via_extended.by_ref().collect();
    let mut via_fallback = Descriptors::new(&legacy);
    let b: Vec<_> = via_fallback.by_ref().collect();

    assert_eq!(via_extended.protocol(), Some(Protocol::Extended));
    assert_eq!(via_fallback.protocol(), Some(Protocol::Fallback));
    assert_eq!(a, b);
    assert_eq!(
        a.iter().map(|d| d.id).collect::<Vec<_>>(),
        vec![
            V4L2_CID_BASE,
            V4L2_CID_BASE + 3,
            V4L2_CID_BASE + 24,
            V4L2_CID_PRIVATE_BASE,
            V4L2_CID_PRIVATE_BASE + 1
        ]
    );
}

#[test]
fn integer_apply_always_lands_on_grid() {
    let dev = Rc::new(MockDevice::new().with(integer(9, -20, 37, 6, -2)));
    let mut session = session(&dev);

    for requested in -100..100 {
        session.apply(9, requested).unwrap();
        let stored = i64::from(dev.stored(9).unwrap());
        assert!((-20..=37).contains(&stored), "{} -> {}", requested, stored);
        assert_eq!((stored + 20) % 6, 0, "{} -> {}", requested, stored);
    }
}

#[test]
fn reset_then_refresh_yields_default_for_every_valued_kind() {
    let dev = Rc::new(
        MockDevice::new()
            .with(integer(1, 0, 100, 5, 50))
            .with(boolean(2, 1))
            .with(menu(3, 0, 3, 2))
            .with_menu(3, &[(0, "Off"), (1, "50 Hz"), (2, "60 Hz"), (3, "Auto")]),
    );
    let mut session = session(&dev);
    dev.poke(1, 5);
    dev.poke(2, 0);
    dev.poke(3, 0);

    for id in 1..=3 {
        session.reset(id).unwrap();
        session.refresh(id).unwrap();
    }

    assert_eq!(session.control(1).unwrap().value(), Value::Integer(50));
    assert_eq!(session.control(2).unwrap().value(), Value::Boolean(true));
    assert_eq!(
        session.control(3).unwrap().value(),
        Value::Menu(2, "60 Hz".into())
    );
}

#[test]
fn failing_refresh_keeps_value_and_spares_siblings() {
    let mut dev = MockDevice::new();
    for id in 1..=10 {
        dev = dev.with(integer(id, 0, 100, 1, id as i64));
    }
    let dev = Rc::new(dev);
    let mut session = session(&dev);

    for id in 1..=10 {
        dev.poke(id, 50 + id as i32);
    }
    dev.fail_get(5);

    let pass = session.refresh_all();

    assert_eq!(pass.done, vec![1, 2, 3, 4, 6, 7, 8, 9, 10]);
    assert_eq!(pass.failed.len(), 1);
    assert!(matches!(pass.failed[0], (5, Error::Get { id: 5, .. })));
    assert_eq!(session.control(5).unwrap().value(), Value::Integer(5));
    for id in (1..=10).filter(|id| *id != 5) {
        assert_eq!(
            session.control(id).unwrap().value(),
            Value::Integer(50 + id as i64)
        );
    }
}

#[test]
fn headers_and_placeholders_sit_out_broadcasts() {
    let dev = Rc::new(
        MockDevice::new()
            .with(class(0x0098_0001, "User Controls"))
            .with(integer(0x0098_0900, 0, 10, 1, 5))
            .with(integer64(0x0098_0901))
            .with(button(0x0098_0902)),
    );
    let mut session = session(&dev);

    let entries: Vec<&Item> = session.entries().collect();
    assert!(matches!(entries[0], Item::Class(d) if d.name == "User Controls"));
    assert!(matches!(entries[2], Item::Control(Control::Unknown(_))));
    assert!(!session.control(0x0098_0901).unwrap().is_interactive());

    dev.clear_sets();
    let reset = session.reset_all();
    assert_eq!(reset.done, vec![0x0098_0900]);
    assert_eq!(dev.sets(), vec![(0x0098_0900, 5)]);

    let refresh = session.refresh_all();
    assert_eq!(refresh.done, vec![0x0098_0900, 0x0098_0902]);
}

#[test]
fn inert_controls_are_visible_but_refuse_writes() {
    let dev = Rc::new(
        MockDevice::new()
            .with(with_flags(integer(1, 0, 10, 1, 3), Flags::READ_ONLY))
            .with(with_flags(boolean(2, 0), Flags::GRABBED))
            .with(with_flags(button(3), Flags::INACTIVE)),
    );
    let mut session = session(&dev);

    for id in 1..=3 {
        assert!(!session.control(id).unwrap().is_interactive());
    }
    assert!(matches!(session.apply(1, 4), Err(Error::Inactive(1))));
    assert!(matches!(session.apply(3, 1), Err(Error::Inactive(3))));
    assert!(dev.sets().is_empty());

    dev.poke(1, 7);
    session.refresh(1).unwrap();
    assert_eq!(session.control(1).unwrap().value(), Value::Integer(7));
}

#[test]
fn reset_all_writes_defaults_to_inactive_controls() {
    // e.g. manual exposure while auto exposure is on
    let dev = Rc::new(
        MockDevice::new()
            .with(with_flags(integer(1, 0, 100, 1, 50), Flags::INACTIVE))
            .with(integer(2, 0, 100, 1, 50))
            .with(with_flags(integer(3, 0, 100, 1, 50), Flags::READ_ONLY)),
    );
    let mut session = session(&dev);
    for id in 1..=3 {
        dev.poke(id, 7);
    }

    assert!(matches!(session.apply(1, 20), Err(Error::Inactive(1))));
    assert!(dev.sets().is_empty());

    let pass = session.reset_all();
    assert_eq!(pass.done, vec![1, 2]);
    assert_eq!(pass.failed.len(), 1);
    assert!(matches!(pass.failed[0], (3, Error::Set { id: 3, .. })));
    assert_eq!(dev.sets(), vec![(1, 50), (2, 50)]);
    assert_eq!(dev.stored(1), Some(50));
    assert_eq!(dev.stored(3), Some(7));
    assert_eq!(session.control(1).unwrap().value(), Value::Integer(50));
    assert_eq!(session.control(3).unwrap().value(), Value::Integer(7));
}

#[test]
fn sparse_menu_reports_unknown_values() {
    let dev = Rc::new(
        MockDevice::new()
            .with(menu(4, 0, 3, 0))
            .with_menu(4, &[(0, "Manual"), (3, "Aperture Priority")]),
    );
    let mut session = session(&dev);

    match session.control(4).unwrap() {
        Control::Menu(menu) => {
            let indices: Vec<u32> = menu.items().iter().map(|(i, _)| *i).collect();
            assert_eq!(indices, vec![0, 3]);
            assert_eq!(menu.label(), "Manual");
        }
        other => panic!("expected a menu, got {:?}", other),
    }

    assert!(matches!(
        session.apply(4, 1),
        Err(Error::OutOfRange { value: 1, .. })
    ));
    assert!(matches!(
        session.apply(4, 9),
        Err(Error::OutOfRange { value: 9, .. })
    ));

    dev.poke(4, 2);
    session.refresh(4).unwrap();
    assert_eq!(
        session.control(4).unwrap().value(),
        Value::Menu(2, UNKNOWN_MENU_VALUE.into())
    );
}

#[test]
fn failed_write_rolls_back_to_device_value() {
    let dev = Rc::new(MockDevice::new().with(integer(1, 0, 10, 1, 4)));
    let mut session = session(&dev);

    dev.poke(1, 6);
    dev.fail_set(1);
    assert!(matches!(session.apply(1, 9), Err(Error::Set { id: 1, .. })));
    assert_eq!(session.control(1).unwrap().value(), Value::Integer(6));
}

#[test]
fn failed_write_with_unreadable_device_keeps_last_value() {
    let dev = Rc::new(MockDevice::new().with(boolean(1, 1)));
    let mut session = session(&dev);
    dev.fail_set(1);
    dev.fail_get(1);

    assert!(matches!(session.apply(1, 0), Err(Error::Set { id: 1, .. })));
    assert_eq!(session.control(1).unwrap().value(), Value::Boolean(true));
    assert!(matches!(session.reset(1), Err(Error::Set { id: 1, .. })));
    assert_eq!(dev.stored(1), Some(1));
}

#[test]
fn non_v4l2_node_is_rejected() {
    let dev: Rc<dyn v4l2ucp::Handle> = Rc::new(MockDevice::not_v4l2());
    let err = Session::with_handle(dev, "/dev/null").err().unwrap();
    assert!(matches!(err, Error::NotCompliant { .. }));
    assert!(err.is_fatal());
}

#[test]
fn missing_node_fails_to_open() {
    let err = Session::open("/nonexistent/video0").err().unwrap();
    assert!(matches!(err, Error::Open { .. }));
}

#[test]
fn removed_control_no_longer_receives_broadcasts() {
    let dev = three_controls();
    let mut session = session(&dev);

    let removed = session.remove(1);
    assert!(matches!(removed, Some(Item::Control(Control::Integer(_)))));
    assert!(session.control(1).is_none());

    dev.clear_sets();
    let pass = session.reset_all();
    assert_eq!(pass.done, vec![2]);
    assert!(matches!(session.apply(1, 2), Err(Error::NoSuchControl(1))));
}

#[test]
fn control_outliving_its_session_is_detached() {
    let dev: Rc<dyn v4l2ucp::Handle> = Rc::new(three_controls_plain());
    let session = Session::with_handle(dev, "/dev/mock0").unwrap();
    let mut escaped = session.control(1).unwrap().clone();

    drop(session);

    assert!(matches!(escaped.refresh(), Err(Error::Detached(1))));
    assert!(matches!(escaped.apply(2), Err(Error::Detached(1))));
}

fn three_controls_plain() -> MockDevice {
    MockDevice::new()
        .with(integer(1, 0, 10, 2, 4))
        .with(boolean(2, 1))
        .with(button(3))
}

#[test]
fn rescan_picks_up_changed_flags() {
    let dev = three_controls();
    let mut session = session(&dev);
    assert!(session.control(1).unwrap().is_interactive());

    dev.set_flags(1, Flags::INACTIVE);
    assert!(session.control(1).unwrap().is_interactive());

    session.rescan();
    assert!(!session.control(1).unwrap().is_interactive());
    assert_eq!(session.controls().count(), 3);
    assert_eq!(session.refresh_all().done, vec![1, 2, 3]);
}

#[test]
fn controls_can_be_found_by_name() {
    let dev = three_controls();
    let session = session(&dev);
    assert_eq!(session.find("boolean 2").map(|c| c.id()), Some(2));
    assert!(session.find("Exposure").is_none());
}

#[test]
fn lookup_accepts_ids_and_names() {
    let dev = three_controls();
    let session = session(&dev);

    assert_eq!(session.lookup("2").unwrap(), 2);
    assert_eq!(session.lookup("0x3").unwrap(), 3);
    assert_eq!(session.lookup("INTEGER 1").unwrap(), 1);
    assert!(matches!(session.lookup("0x99"), Err(Error::NoSuchControl(0x99))));

    let err = session.lookup("Exposure").unwrap_err();
    assert!(matches!(&err, Error::NoSuchName(name) if name == "Exposure"));
    assert_eq!(err.to_string(), "no control named \"Exposure\"");
}
