//! Array process variables exercised through a manager pair.

use std::sync::Arc;

use pv_adapter::{
    MonotonicVersionNumberSource, ProcessVariable, SynchronizationDirection, VersionNumberSource,
    create_pv_manager,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_iterate_and_sort_without_element_copy() {
    init_logging();
    let (cs_manager, dev_manager) = create_pv_manager();
    let source: Arc<dyn VersionNumberSource> = Arc::new(MonotonicVersionNumberSource::new());

    let device_array = dev_manager
        .create_process_array::<i32>(
            SynchronizationDirection::DeviceToControlSystem,
            "INT/FROM_DEVICE_ARRAY",
            &[0; 12],
            2,
            None,
            Some(source),
        )
        .unwrap();
    let cs_array = cs_manager
        .process_array::<i32>("INT/FROM_DEVICE_ARRAY")
        .unwrap();

    device_array.with_values_mut(|values| {
        for (i, value) in values.iter_mut().enumerate() {
            *value = 42 + i as i32;
        }
    });
    let sent_ptr = device_array.with_values(|values| values.as_ptr() as usize);

    device_array.send().unwrap();
    assert!(cs_array.receive().unwrap());

    // The peer adopted the sender's allocation; no element was copied on the
    // send/receive path.
    let received_ptr = cs_array.with_values(|values| values.as_ptr() as usize);
    assert_eq!(received_ptr, sent_ptr);

    cs_array.with_values_mut(|values| values.sort_unstable_by(|a, b| b.cmp(a)));
    let expected: Vec<i32> = (42..=53).rev().collect();
    assert_eq!(cs_array.get(), expected);
}

#[test]
fn test_array_write_to_device() {
    init_logging();
    let (cs_manager, dev_manager) = create_pv_manager();

    let device_array = dev_manager
        .create_process_array::<f64>(
            SynchronizationDirection::ControlSystemToDevice,
            "DOUBLE/TO_DEVICE_ARRAY",
            &[0.0; 6],
            2,
            None,
            None,
        )
        .unwrap();
    assert!(device_array.is_receiver());

    let cs_array = cs_manager
        .process_array::<f64>("DOUBLE/TO_DEVICE_ARRAY")
        .unwrap();
    cs_array.set(&[1.5, 2.5, 3.5, 4.5, 5.5, 6.5]);
    cs_array.send().unwrap();

    assert!(device_array.receive().unwrap());
    assert_eq!(device_array.get(), vec![1.5, 2.5, 3.5, 4.5, 5.5, 6.5]);
    assert_eq!(device_array.len(), 6);
}

#[test]
fn test_array_overflow_keeps_latest() {
    init_logging();
    let (cs_manager, dev_manager) = create_pv_manager();

    let device_array = dev_manager
        .create_process_array::<u16>(
            SynchronizationDirection::DeviceToControlSystem,
            "BURST",
            &[0; 3],
            2,
            None,
            None,
        )
        .unwrap();
    let cs_array = cs_manager.process_array::<u16>("BURST").unwrap();

    for round in 1..=5u16 {
        device_array.set(&[round; 3]);
        device_array.send().unwrap();
    }

    // Ring of two: only the last two bursts survive.
    assert!(cs_array.receive().unwrap());
    assert_eq!(cs_array.get(), vec![4; 3]);
    assert!(cs_array.receive().unwrap());
    assert_eq!(cs_array.get(), vec![5; 3]);
    assert!(!cs_array.receive().unwrap());
}
