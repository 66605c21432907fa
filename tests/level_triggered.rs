mod common;

use common::{fd_of, init_logger, manual_instance, socket_pair};
use epoll_shim::{Event, Events, Instance, Payload};
use std::io::{Read, Write};

#[test]
fn test_readable_reports_payload() {
    init_logger();
    let instance = Instance::create1(0).unwrap();
    let (watched, mut peer) = socket_pair();

    instance
        .add(fd_of(&watched), &Event::readable(Payload::U64(42)))
        .unwrap();
    peer.write_all(b"ping").unwrap();

    let mut events = [Event::default(); 8];
    let n = instance.wait(&mut events, 1000).unwrap();

    assert_eq!(n, 1);
    assert!(events[0].is_readable());
    assert_eq!(events[0].data, Payload::U64(42));
}

#[test]
fn test_reported_on_every_wait_until_drained() {
    init_logger();
    let instance = Instance::create(1).unwrap();
    let (mut watched, mut peer) = socket_pair();

    instance
        .add(fd_of(&watched), &Event::readable(Payload::Fd(fd_of(&watched))))
        .unwrap();
    peer.write_all(b"data").unwrap();

    let mut events = [Event::default(); 4];
    for _ in 0..3 {
        assert_eq!(instance.wait(&mut events, 1000).unwrap(), 1);
        assert!(events[0].is_readable());
    }

    let mut buf = [0u8; 16];
    assert_eq!(watched.read(&mut buf).unwrap(), 4);

    assert_eq!(instance.wait(&mut events, 50).unwrap(), 0);
}

#[test]
fn test_writable_is_reported_immediately() {
    init_logger();
    let instance = Instance::create1(0).unwrap();
    let (watched, _peer) = socket_pair();

    instance
        .add(fd_of(&watched), &Event::writable(Payload::Ptr(0x1000)))
        .unwrap();

    let mut events = [Event::default(); 2];
    assert_eq!(instance.wait(&mut events, 1000).unwrap(), 1);
    assert!(events[0].is_writable());
    assert!(!events[0].is_readable());
    assert_eq!(events[0].data, Payload::Ptr(0x1000));
}

#[test]
fn test_hangup_is_reported_without_interest() {
    init_logger();
    let instance = Instance::create1(0).unwrap();
    let (watched, peer) = socket_pair();

    instance
        .add(fd_of(&watched), &Event::none(Payload::U32(3)))
        .unwrap();
    drop(peer);

    let mut events = [Event::default(); 2];
    assert_eq!(instance.wait(&mut events, 1000).unwrap(), 1);
    assert!(events[0].is_hangup());
    assert!(!events[0].is_readable());
}

#[test]
fn test_rearms_with_fresh_request_after_report() {
    let instance = manual_instance();
    let port = instance.port();

    instance.add(10, &Event::readable(Payload::Fd(10))).unwrap();
    assert_eq!(port.submissions(), 1);

    assert!(port.fire(10, Events::IN));
    let mut events = [Event::default(); 4];
    assert_eq!(instance.wait(&mut events, 0).unwrap(), 1);

    // Reported level-triggered Watches get a brand new request.
    assert_eq!(port.submissions(), 2);
    assert_eq!(port.pending_for(10), 1);

    // Without a new completion nothing is replayed.
    assert_eq!(instance.wait(&mut events, 0).unwrap(), 0);

    assert!(port.fire(10, Events::IN));
    assert_eq!(instance.wait(&mut events, 0).unwrap(), 1);
}

#[test]
fn test_unrequested_bits_are_masked() {
    let instance = manual_instance();
    let port = instance.port();

    instance.add(10, &Event::readable(Payload::Fd(10))).unwrap();
    assert!(port.fire(10, Events::IN | Events::OUT | Events::ERR));

    let mut events = [Event::default(); 1];
    assert_eq!(instance.wait(&mut events, 0).unwrap(), 1);
    assert_eq!(events[0].events, Events::IN | Events::ERR);
}

#[test]
fn test_completion_outside_interest_rearms_silently() {
    let instance = manual_instance();
    let port = instance.port();

    instance.add(10, &Event::readable(Payload::Fd(10))).unwrap();
    assert!(port.fire(10, Events::OUT));

    let mut events = [Event::default(); 1];
    assert_eq!(instance.wait(&mut events, 0).unwrap(), 0);
    assert_eq!(port.pending_for(10), 1);
}

#[test]
fn test_submit_failure_reports_error_event() {
    let instance = manual_instance();
    let port = instance.port();
    port.fail_submissions_for(10);

    instance.add(10, &Event::readable(Payload::U32(1))).unwrap();

    let mut events = [Event::default(); 1];
    assert_eq!(instance.wait(&mut events, 0).unwrap(), 1);
    assert_eq!(events[0].events, Events::ERR);
    assert_eq!(events[0].data, Payload::U32(1));
}
