//! End-to-end test against a stub device core: the control system writes a
//! value, the device loop copies it back, the control system reads it.

use std::sync::Arc;

use pv_adapter::{
    ControlSystemPvManager, ControlSystemSynchronizationUtility, DevicePvManager,
    DeviceSynchronizationUtility, MonotonicVersionNumberSource, ProcessVariable,
    SynchronizationDirection, VersionNumberSource, create_pv_manager,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A minimal device core: one writable scalar, one readable scalar and one
/// constant per supported element type, named like
/// `INT/TO_DEVICE_SCALAR`.
struct TestCoreFixture {
    cs_manager: Arc<ControlSystemPvManager>,
    dev_manager: Arc<DevicePvManager>,
    cs_util: ControlSystemSynchronizationUtility,
    dev_util: DeviceSynchronizationUtility,
}

macro_rules! create_typed_channels {
    ($fixture:expr, $source:expr, $($ty:ty => ($prefix:expr, $constant:expr)),* $(,)?) => {
        $(
            $fixture.dev_manager
                .create_process_scalar::<$ty>(
                    SynchronizationDirection::ControlSystemToDevice,
                    concat!($prefix, "/TO_DEVICE_SCALAR"),
                    <$ty>::default(),
                    2,
                    None,
                    Some($source.clone()),
                )
                .unwrap();
            $fixture.dev_manager
                .create_process_scalar::<$ty>(
                    SynchronizationDirection::DeviceToControlSystem,
                    concat!($prefix, "/FROM_DEVICE_SCALAR"),
                    <$ty>::default(),
                    2,
                    None,
                    Some($source.clone()),
                )
                .unwrap();
            $fixture.dev_manager
                .create_process_scalar::<$ty>(
                    SynchronizationDirection::DeviceToControlSystem,
                    concat!($prefix, "/DATA_TYPE_CONSTANT"),
                    $constant,
                    2,
                    None,
                    Some($source.clone()),
                )
                .unwrap();
        )*
    };
}

/// One device-loop iteration: take in written values, mirror them back.
macro_rules! copy_to_from_device {
    ($fixture:expr, $($ty:ty => $prefix:expr),* $(,)?) => {
        $(
            let to_device = $fixture.dev_manager
                .process_scalar::<$ty>(concat!($prefix, "/TO_DEVICE_SCALAR"))
                .unwrap();
            let from_device = $fixture.dev_manager
                .process_scalar::<$ty>(concat!($prefix, "/FROM_DEVICE_SCALAR"))
                .unwrap();
            from_device.set(to_device.get());
            from_device.send().unwrap();
        )*
    };
}

impl TestCoreFixture {
    fn new() -> Self {
        init_logging();
        let (cs_manager, dev_manager) = create_pv_manager();
        let fixture = Self {
            cs_util: ControlSystemSynchronizationUtility::new(cs_manager.clone()),
            dev_util: DeviceSynchronizationUtility::new(dev_manager.clone()),
            cs_manager,
            dev_manager,
        };

        let source: Arc<dyn VersionNumberSource> = Arc::new(MonotonicVersionNumberSource::new());
        create_typed_channels!(fixture, source,
            i8 => ("CHAR", -1i8),
            u8 => ("UCHAR", 1u8),
            i16 => ("SHORT", -2i16),
            u16 => ("USHORT", 2u16),
            i32 => ("INT", -4i32),
            u32 => ("UINT", 4u32),
            f32 => ("FLOAT", 0.25f32),
            f64 => ("DOUBLE", 0.125f64),
        );

        // Publish the initial device-side values so the constants are
        // visible to the control system right after construction.
        fixture.dev_util.send_all().unwrap();
        fixture.cs_util.receive_all().unwrap();
        fixture
    }

    fn device_main_body(&self) {
        self.dev_util.receive_all().unwrap();
        copy_to_from_device!(self,
            i8 => "CHAR",
            u8 => "UCHAR",
            i16 => "SHORT",
            u16 => "USHORT",
            i32 => "INT",
            u32 => "UINT",
            f32 => "FLOAT",
            f64 => "DOUBLE",
        );
    }
}

macro_rules! typed_write_test {
    ($fixture:expr, $ty:ty, $prefix:expr) => {{
        let to_device = $fixture
            .cs_manager
            .process_scalar::<$ty>(concat!($prefix, "/TO_DEVICE_SCALAR"))
            .unwrap();
        let from_device = $fixture
            .cs_manager
            .process_scalar::<$ty>(concat!($prefix, "/FROM_DEVICE_SCALAR"))
            .unwrap();

        let previous = from_device.get();
        to_device.set(previous + 13 as $ty);

        $fixture.cs_util.send_all().unwrap();
        $fixture.device_main_body();
        $fixture.cs_util.receive_all().unwrap();

        assert_eq!(from_device.get(), previous + 13 as $ty);
    }};
}

#[test]
fn test_read_scalar_constants() {
    let fixture = TestCoreFixture::new();
    let cs = &fixture.cs_manager;

    assert_eq!(cs.process_scalar::<i8>("CHAR/DATA_TYPE_CONSTANT").unwrap().get(), -1);
    assert_eq!(cs.process_scalar::<u8>("UCHAR/DATA_TYPE_CONSTANT").unwrap().get(), 1);
    assert_eq!(cs.process_scalar::<i16>("SHORT/DATA_TYPE_CONSTANT").unwrap().get(), -2);
    assert_eq!(cs.process_scalar::<u16>("USHORT/DATA_TYPE_CONSTANT").unwrap().get(), 2);
    assert_eq!(cs.process_scalar::<i32>("INT/DATA_TYPE_CONSTANT").unwrap().get(), -4);
    assert_eq!(cs.process_scalar::<u32>("UINT/DATA_TYPE_CONSTANT").unwrap().get(), 4);
    assert_eq!(cs.process_scalar::<f32>("FLOAT/DATA_TYPE_CONSTANT").unwrap().get(), 0.25);
    assert_eq!(cs.process_scalar::<f64>("DOUBLE/DATA_TYPE_CONSTANT").unwrap().get(), 0.125);
}

#[test]
fn test_write_scalar_round_trips() {
    let fixture = TestCoreFixture::new();
    typed_write_test!(fixture, i8, "CHAR");
    typed_write_test!(fixture, u8, "UCHAR");
    typed_write_test!(fixture, i16, "SHORT");
    typed_write_test!(fixture, u16, "USHORT");
    typed_write_test!(fixture, i32, "INT");
    typed_write_test!(fixture, u32, "UINT");
    typed_write_test!(fixture, f32, "FLOAT");
    typed_write_test!(fixture, f64, "DOUBLE");
}

#[test]
fn test_write_scalar_advances_version() {
    init_logging();
    let (cs_manager, dev_manager) = create_pv_manager();
    let source: Arc<dyn VersionNumberSource> = Arc::new(MonotonicVersionNumberSource::new());
    let device_pv = dev_manager
        .create_process_scalar::<i32>(
            SynchronizationDirection::ControlSystemToDevice,
            "INT/TO_DEVICE_SCALAR",
            0,
            2,
            None,
            Some(source),
        )
        .unwrap();

    let cs_util = ControlSystemSynchronizationUtility::new(cs_manager.clone());
    let dev_util = DeviceSynchronizationUtility::new(dev_manager);

    let previous_version = device_pv.version_number();
    cs_manager
        .process_scalar::<i32>("INT/TO_DEVICE_SCALAR")
        .unwrap()
        .set(13);
    cs_util.send_all().unwrap();
    dev_util.receive_all().unwrap();

    assert_eq!(device_pv.get(), 13);
    assert_eq!(device_pv.version_number(), previous_version + 1);
}
