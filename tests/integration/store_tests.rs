//! Parameter store integrity across reboots, corruption and power loss.

use smartscale::adapters::nvs::NvsRegion;
use smartscale::app::ports::{NoIrqGate, RegionPort, StorageError};
use smartscale::config::{CHECKSUM_OFFSET, REGION_LEN};
use smartscale::error::{Error, IntegrityError};
use smartscale::store::{layout, BootReport, Param, ParameterSet, ParameterStore};

fn boot(region: NvsRegion) -> (ParameterStore<NvsRegion, NoIrqGate>, BootReport) {
    let mut store = ParameterStore::new(region, NoIrqGate);
    let report = store.initialize().unwrap();
    (store, report)
}

fn assert_sealed(image: &layout::RegionImage) {
    assert_eq!(
        layout::stored_checksum(image),
        layout::compute_checksum(image),
        "region must carry a valid checksum"
    );
}

fn custom() -> ParameterSet {
    ParameterSet {
        calibration_factor: -2280.0,
        weight_setpoint: 26.0,
        timer_threshold: 11.0,
    }
}

// ── Reboot ────────────────────────────────────────────────────

#[test]
fn every_parameter_survives_reboot() {
    let (mut store, _) = boot(NvsRegion::new());
    let want = custom();
    for p in Param::ALL {
        store.set_parameter(p, want.get(p)).unwrap();
    }

    let (rebooted, report) = boot(store.region().reboot());
    assert!(report.is_clean());
    assert_eq!(rebooted.snapshot(), want);
    assert_sealed(&rebooted.region().durable_bytes());
}

#[test]
fn double_initialize_is_a_noop() {
    let (mut store, _) = boot(NvsRegion::from_durable(layout::encode(&custom())));
    let commits = store.region().commit_count();

    let report = store.initialize().unwrap();
    assert!(report.is_clean());
    assert_eq!(store.region().commit_count(), commits);
    assert_eq!(store.snapshot(), custom());
}

// ── Corruption ────────────────────────────────────────────────

#[test]
fn single_byte_corruption_anywhere_resets_to_defaults() {
    let good = layout::encode(&custom());
    for offset in [0usize, 3, 5, 9, 12, 15, 100, 255, CHECKSUM_OFFSET - 1] {
        let mut image = good;
        image[offset] ^= 0x5A;

        let (store, report) = boot(NvsRegion::from_durable(image));
        assert!(
            matches!(
                report.recovered.as_slice(),
                [IntegrityError::ChecksumMismatch { .. }]
            ),
            "offset {offset}: {report:?}"
        );
        assert_eq!(store.snapshot(), ParameterSet::DEFAULT, "offset {offset}");
        assert_sealed(&store.region().durable_bytes());
    }
}

#[test]
fn corrupted_checksum_slot_resets_to_defaults() {
    let mut image = layout::encode(&custom());
    image[REGION_LEN - 1] ^= 0x01;

    let (store, report) = boot(NvsRegion::from_durable(image));
    assert!(!report.is_clean());
    assert_eq!(store.snapshot(), ParameterSet::DEFAULT);
}

#[test]
fn short_region_is_a_storage_error() {
    let mut store = ParameterStore::new(NvsRegion::with_len(64), NoIrqGate);
    assert_eq!(store.initialize(), Err(StorageError::OutOfBounds));
}

// ── Power loss ────────────────────────────────────────────────

/// Lets `budget` commits through, then drops every later one, as if power
/// failed mid-sequence.
struct PowerCut {
    inner: NvsRegion,
    budget: u32,
}

impl RegionPort for PowerCut {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        self.inner.read(offset, buf)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        self.inner.write(offset, data)
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if self.budget == 0 {
            return Err(StorageError::Io);
        }
        self.budget -= 1;
        self.inner.commit()
    }
}

#[test]
fn power_loss_between_field_and_checksum_boots_valid() {
    let region = PowerCut {
        inner: NvsRegion::from_durable(layout::encode(&custom())),
        // field commit succeeds, checksum commit is lost
        budget: 1,
    };
    let mut store = ParameterStore::new(region, NoIrqGate);
    store.initialize().unwrap();

    let err = store.set_parameter(Param::WeightSetpoint, 21.0).unwrap_err();
    assert_eq!(err, Error::Storage(StorageError::Io));

    let (rebooted, report) = boot(store.region().inner.reboot());
    assert!(!report.is_clean());
    assert_eq!(rebooted.snapshot(), ParameterSet::DEFAULT);
    assert_sealed(&rebooted.region().durable_bytes());
}

#[test]
fn power_loss_before_field_commit_keeps_old_values() {
    let region = PowerCut {
        inner: NvsRegion::from_durable(layout::encode(&custom())),
        budget: 0,
    };
    let mut store = ParameterStore::new(region, NoIrqGate);
    store.initialize().unwrap();

    assert!(store.set_parameter(Param::WeightSetpoint, 21.0).is_err());

    let (rebooted, report) = boot(store.region().inner.reboot());
    assert!(report.is_clean());
    assert_eq!(rebooted.snapshot(), custom());
}

/// Fails the next commit once when armed; every other commit goes through.
struct FlakyCommit {
    inner: NvsRegion,
    fail_next: bool,
}

impl RegionPort for FlakyCommit {
    fn len(&self) -> usize {
        self.inner.len()
    }

    fn read(&self, offset: usize, buf: &mut [u8]) -> Result<(), StorageError> {
        self.inner.read(offset, buf)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), StorageError> {
        self.inner.write(offset, data)
    }

    fn commit(&mut self) -> Result<(), StorageError> {
        if std::mem::take(&mut self.fail_next) {
            return Err(StorageError::Io);
        }
        self.inner.commit()
    }
}

#[test]
fn failed_write_is_not_persisted_by_a_later_one() {
    let region = FlakyCommit {
        inner: NvsRegion::from_durable(layout::encode(&custom())),
        fail_next: false,
    };
    let mut store = ParameterStore::new(region, NoIrqGate);
    store.initialize().unwrap();

    store.region_mut().fail_next = true;
    assert_eq!(
        store.set_parameter(Param::WeightSetpoint, 25.0),
        Err(Error::Storage(StorageError::Io))
    );
    assert_eq!(store.get_parameter(Param::WeightSetpoint), 26.0);

    store.set_parameter(Param::CalibrationFactor, 500.0).unwrap();

    let (rebooted, report) = boot(store.region().inner.reboot());
    assert!(report.is_clean());
    assert_eq!(rebooted.snapshot(), store.snapshot());
    assert_eq!(rebooted.get_parameter(Param::WeightSetpoint), 26.0);
    assert_eq!(rebooted.get_parameter(Param::CalibrationFactor), 500.0);
}
