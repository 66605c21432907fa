mod common;

use common::manual_instance;
use epoll_shim::{CtlOp, Error, Event, Instance, Payload};

#[test]
fn test_duplicate_add_is_rejected() {
    let instance = manual_instance();
    instance.add(10, &Event::readable(Payload::Fd(10))).unwrap();

    let err = instance.add(10, &Event::writable(Payload::Fd(10))).unwrap_err();
    assert!(matches!(err, Error::AlreadyRegistered));
    assert_eq!(err.code(), libc::EEXIST);
    assert_eq!(instance.len(), 1);
    assert_eq!(instance.port().pending_for(10), 1);
}

#[test]
fn test_modify_unknown_handle() {
    let instance = manual_instance();

    let err = instance.modify(10, &Event::readable(Payload::Fd(10))).unwrap_err();
    assert!(matches!(err, Error::NotFound));
    assert_eq!(err.code(), libc::ENOENT);
}

#[test]
fn test_delete_unknown_handle() {
    let instance = manual_instance();

    assert!(matches!(instance.delete(10), Err(Error::NotFound)));
    instance.add(10, &Event::readable(Payload::Fd(10))).unwrap();
    instance.delete(10).unwrap();
    assert!(matches!(instance.delete(10), Err(Error::NotFound)));
}

#[test]
fn test_ctl_requires_event_for_add_and_modify() {
    let instance = manual_instance();

    assert!(matches!(
        instance.ctl(CtlOp::Add, 10, None),
        Err(Error::InvalidArgument)
    ));
    assert!(instance.is_empty());

    let event = Event::readable(Payload::Fd(10));
    instance.ctl(CtlOp::Add, 10, Some(&event)).unwrap();
    assert!(matches!(
        instance.ctl(CtlOp::Mod, 10, None),
        Err(Error::InvalidArgument)
    ));

    // The event is ignored for deletes.
    instance.ctl(CtlOp::Del, 10, None).unwrap();
    assert!(instance.is_empty());
}

#[test]
fn test_negative_handle_is_invalid() {
    let instance = manual_instance();
    let event = Event::readable(Payload::Fd(-1));

    assert!(matches!(instance.add(-1, &event), Err(Error::InvalidHandle)));
    assert!(matches!(
        instance.ctl(CtlOp::Del, -1, None),
        Err(Error::InvalidHandle)
    ));
    assert_eq!(Error::InvalidHandle.code(), libc::EBADF);
}

#[test]
fn test_unknown_op_code() {
    assert_eq!(CtlOp::try_from(1).unwrap(), CtlOp::Add);
    assert_eq!(CtlOp::try_from(2).unwrap(), CtlOp::Mod);
    assert_eq!(CtlOp::try_from(3).unwrap(), CtlOp::Del);
    assert!(matches!(CtlOp::try_from(0), Err(Error::InvalidArgument)));
    assert!(matches!(CtlOp::try_from(4), Err(Error::InvalidArgument)));
}

#[test]
fn test_create_arguments() {
    assert!(Instance::create(0).is_ok());
    assert!(Instance::create(1024).is_ok());
    assert!(matches!(Instance::create(-1), Err(Error::InvalidArgument)));

    assert!(Instance::create1(0).is_ok());
    assert!(matches!(Instance::create1(1), Err(Error::InvalidArgument)));
}

#[test]
fn test_wait_rejects_empty_buffer() {
    let instance = manual_instance();
    let mut events: [Event; 0] = [];

    assert!(matches!(
        instance.wait(&mut events, 0),
        Err(Error::InvalidArgument)
    ));
}

#[test]
fn test_len_tracks_registrations() {
    let instance = manual_instance();
    for handle in 10..15 {
        instance.add(handle, &Event::readable(Payload::Fd(handle))).unwrap();
    }
    assert_eq!(instance.len(), 5);

    instance.delete(12).unwrap();
    assert_eq!(instance.len(), 4);
}
