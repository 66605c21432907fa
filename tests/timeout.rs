mod common;

use common::{fd_of, init_logger, manual_instance, socket_pair};
use epoll_shim::{Event, Events, Instance, Payload};
use std::io::Write;
use std::time::{Duration, Instant};

#[test]
fn test_zero_timeout_never_blocks() {
    init_logger();
    let instance = Instance::create1(0).unwrap();
    let (watched, _peer) = socket_pair();
    instance
        .add(fd_of(&watched), &Event::readable(Payload::U64(1)))
        .unwrap();

    let mut events = [Event::default(); 4];
    let start = Instant::now();
    assert_eq!(instance.wait(&mut events, 0).unwrap(), 0);
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_wait_times_out() {
    init_logger();
    let instance = Instance::create1(0).unwrap();
    let (watched, _peer) = socket_pair();
    instance
        .add(fd_of(&watched), &Event::readable(Payload::U64(1)))
        .unwrap();

    let mut events = [Event::default(); 4];
    let start = Instant::now();
    assert_eq!(instance.wait(&mut events, 100).unwrap(), 0);
    assert!(start.elapsed() >= Duration::from_millis(90));
}

#[test]
fn test_pwait2_nanosecond_timeout() {
    let instance = manual_instance();
    instance.add(10, &Event::readable(Payload::Fd(10))).unwrap();

    let mut events = [Event::default(); 4];
    let start = Instant::now();
    let n = instance
        .pwait2(&mut events, Some(Duration::from_micros(1500)), false)
        .unwrap();
    assert_eq!(n, 0);
    assert!(start.elapsed() >= Duration::from_micros(1500));
}

#[test]
fn test_full_buffer_returns_capacity() {
    init_logger();
    let instance = Instance::create1(0).unwrap();

    let mut pairs = Vec::new();
    for index in 0..8u64 {
        let (watched, mut peer) = socket_pair();
        peer.write_all(b"x").unwrap();
        instance
            .add(fd_of(&watched), &Event::readable(Payload::U64(index)))
            .unwrap();
        pairs.push((watched, peer));
    }

    let mut events = [Event::default(); 3];
    assert_eq!(instance.wait(&mut events, 1000).unwrap(), 3);

    // The remainder is already ready: no blocking needed.
    let start = Instant::now();
    assert_eq!(instance.wait(&mut events, 0).unwrap(), 3);
    assert_eq!(instance.wait(&mut events, 0).unwrap(), 2);
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[test]
fn test_ready_events_are_reported_in_completion_order() {
    let instance = manual_instance();
    let port = instance.port();
    for handle in 10..14 {
        instance.add(handle, &Event::readable(Payload::Fd(handle))).unwrap();
    }
    for handle in [13, 11, 12, 10] {
        assert!(port.fire(handle, Events::IN));
    }

    let mut events = [Event::default(); 2];
    assert_eq!(instance.wait(&mut events, 0).unwrap(), 2);
    assert_eq!(events[0].data, Payload::Fd(13));
    assert_eq!(events[1].data, Payload::Fd(11));

    assert_eq!(instance.wait(&mut events, 0).unwrap(), 2);
    assert_eq!(events[0].data, Payload::Fd(12));
    assert_eq!(events[1].data, Payload::Fd(10));
}
