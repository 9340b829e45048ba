// SPDX-License-Identifier: GPL-3.0-only
//! Startup pass over already attached drives
//!
//! Runs once before hotplug monitoring. Besides lighting the LEDs of the
//! drives present at boot it fixes the [`IndexOffset`] used for the rest of
//! the process lifetime: every decoy adapter numbered below the first real
//! bay pushes the offset forward.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::config::TopologyConfig;
use crate::error::{AppError, Result};

use super::projector::{BayNumber, LedProjector};
use super::topology::{BayIndex, IndexOffset, TopologyNode, TopologyResolver};

enum Slot<D> {
    Bay(D),
    Decoy,
}

/// Resolved devices keyed by raw, uncorrected slot number
struct BayMap<D> {
    slots: BTreeMap<u64, Slot<D>>,
}

impl<D> BayMap<D> {
    fn new() -> Self {
        Self { slots: BTreeMap::new() }
    }

    fn insert(&mut self, index: BayIndex, device: D) {
        let slot = match index {
            BayIndex::Unresolved => return,
            BayIndex::Confirmed(_) => Slot::Bay(device),
            BayIndex::Decoy(_) => Slot::Decoy,
        };

        match self.slots.entry(index.magnitude()) {
            Entry::Vacant(entry) => {
                entry.insert(slot);
            }
            Entry::Occupied(entry) => {
                debug!("slot {} already taken, ignoring duplicate", entry.key());
            }
        }
    }

    /// Walk slots in ascending order, freezing the offset at the first real bay
    fn into_enumeration(self) -> Enumeration<D> {
        let mut offset = IndexOffset::default();
        let mut found_valid = false;
        let mut bays = Vec::new();

        for (key, slot) in self.slots {
            let device = match slot {
                Slot::Decoy => {
                    if !found_valid {
                        offset = IndexOffset::new(u32::try_from(key).unwrap_or(u32::MAX));
                    }
                    continue;
                }
                Slot::Bay(device) => device,
            };

            if !found_valid {
                debug!("led_index_offset = {}", offset.value());
                found_valid = true;
            }

            let corrected = key as i64 - i64::from(offset.value());
            match BayNumber::new(corrected) {
                Some(bay) => bays.push((bay, device)),
                None => warn!("Slot {} maps to bay {}, which this chassis does not have", key, corrected),
            }
        }

        Enumeration { offset, bays }
    }
}

/// Result of the startup pass
#[derive(Debug)]
pub struct Enumeration<D> {
    /// Frozen offset for hotplug resolution
    pub offset: IndexOffset,
    /// Drives present at startup, in ascending bay order
    pub bays: Vec<(BayNumber, D)>,
}

impl<D: TopologyNode> Enumeration<D> {
    /// Emit an "added" notification for every drive found
    pub fn project(&self, projector: &mut LedProjector<'_>) {
        for (bay, device) in &self.bays {
            projector.project(device, *bay, true);
        }
    }
}

pub struct DeviceEnumerator<'a> {
    resolver: &'a TopologyResolver,
}

impl<'a> DeviceEnumerator<'a> {
    pub fn new(resolver: &'a TopologyResolver) -> Self {
        Self { resolver }
    }

    /// Resolve `devices` and order them into bays
    pub fn enumerate<D, I>(&self, devices: I) -> Enumeration<D>
    where
        D: TopologyNode,
        I: IntoIterator<Item = D>,
    {
        let mut map = BayMap::new();
        for device in devices {
            debug!("Device '{}'", device.syspath());
            let index = self.resolver.resolve(&device, IndexOffset::default());
            map.insert(index, device);
        }
        map.into_enumeration()
    }

    /// Scan the drives attached right now
    pub fn scan(&self) -> Result<Vec<udev::Device>> {
        scan_attached(self.resolver.config())
    }
}

/// All devices whose DEVTYPE matches the configured device type
pub fn scan_attached(config: &TopologyConfig) -> Result<Vec<udev::Device>> {
    let mut enumerator = udev::Enumerator::new().map_err(AppError::Enumerate)?;
    enumerator
        .match_property("DEVTYPE", &config.device_devtype)
        .map_err(AppError::Enumerate)?;
    let devices: Vec<_> = enumerator.scan_devices().map_err(AppError::Enumerate)?.collect();
    debug!("Found {} attached {} device(s)", devices.len(), config.device_devtype);
    Ok(devices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bays::topology::fake::FakeDevice;
    use crate::leds::LedColor;
    use crate::leds::recording::RecordingLeds;

    fn resolver() -> TopologyResolver {
        TopologyResolver::new(TopologyConfig::default())
    }

    fn bay_numbers<D>(enumeration: &Enumeration<D>) -> Vec<u8> {
        enumeration.bays.iter().map(|(bay, _)| bay.get()).collect()
    }

    #[test]
    fn test_leading_decoys_freeze_offset() {
        // hosts 0 and 1 are USB (keys 1, 2), host 2 is the first real bay (key 3)
        let devices = vec![
            FakeDevice::disk(0, Some("usb")),
            FakeDevice::disk(1, Some("usb")),
            FakeDevice::disk(2, Some("pci")),
        ];
        let resolver = resolver();
        let enumeration = DeviceEnumerator::new(&resolver).enumerate(devices);
        assert_eq!(enumeration.offset, IndexOffset::new(2));
        assert_eq!(bay_numbers(&enumeration), vec![1]);
    }

    #[test]
    fn test_without_decoys_offset_stays_zero() {
        let resolver = resolver();
        let enumeration = DeviceEnumerator::new(&resolver).enumerate(vec![FakeDevice::disk(2, Some("pci"))]);
        assert_eq!(enumeration.offset, IndexOffset::default());
        assert_eq!(bay_numbers(&enumeration), vec![3]);
    }

    #[test]
    fn test_bays_emitted_in_ascending_order() {
        let devices = vec![
            FakeDevice::disk(3, Some("pci")),
            FakeDevice::disk(0, Some("usb")),
            FakeDevice::disk(1, Some("pci")),
            FakeDevice::disk(2, Some("pci")),
        ];
        let resolver = resolver();
        let enumeration = DeviceEnumerator::new(&resolver).enumerate(devices);
        assert_eq!(enumeration.offset, IndexOffset::new(1));
        assert_eq!(bay_numbers(&enumeration), vec![1, 2, 3]);
    }

    #[test]
    fn test_decoy_after_first_bay_does_not_move_offset() {
        let devices = vec![
            FakeDevice::disk(0, Some("pci")),
            FakeDevice::disk(1, Some("usb")),
            FakeDevice::disk(2, Some("pci")),
        ];
        let resolver = resolver();
        let enumeration = DeviceEnumerator::new(&resolver).enumerate(devices);
        assert_eq!(enumeration.offset, IndexOffset::default());
        assert_eq!(bay_numbers(&enumeration), vec![1, 3]);
    }

    #[test]
    fn test_unresolved_devices_dropped() {
        let devices = vec![
            FakeDevice::orphan(0),
            FakeDevice::disk_without_sysnum(),
            FakeDevice::disk(1, Some("pci")),
        ];
        let resolver = resolver();
        let enumeration = DeviceEnumerator::new(&resolver).enumerate(devices);
        // unresolved devices never count as decoys
        assert_eq!(enumeration.offset, IndexOffset::default());
        assert_eq!(bay_numbers(&enumeration), vec![2]);
    }

    #[test]
    fn test_no_bays_is_not_an_error() {
        let resolver = resolver();
        let enumeration = DeviceEnumerator::new(&resolver).enumerate(vec![FakeDevice::disk(0, Some("usb"))]);
        assert!(enumeration.bays.is_empty());
        assert_eq!(enumeration.offset, IndexOffset::new(1));

        let enumeration = DeviceEnumerator::new(&resolver).enumerate(Vec::<FakeDevice>::new());
        assert!(enumeration.bays.is_empty());
        assert_eq!(enumeration.offset, IndexOffset::default());
    }

    #[test]
    fn test_bays_beyond_chassis_skipped() {
        let resolver = resolver();
        let enumeration = DeviceEnumerator::new(&resolver).enumerate(vec![
            FakeDevice::disk(3, Some("pci")),
            FakeDevice::disk(7, Some("pci")),
        ]);
        assert_eq!(bay_numbers(&enumeration), vec![4]);
    }

    #[test]
    fn test_enumeration_is_repeatable() {
        let devices = || {
            vec![
                FakeDevice::disk(1, Some("pci")),
                FakeDevice::disk(0, Some("usb")),
                FakeDevice::disk(3, Some("pci")),
            ]
        };
        let resolver = resolver();
        let first = DeviceEnumerator::new(&resolver).enumerate(devices());
        let second = DeviceEnumerator::new(&resolver).enumerate(devices());
        assert_eq!(first.offset, second.offset);
        assert_eq!(bay_numbers(&first), bay_numbers(&second));
    }

    #[test]
    fn test_enumerated_bay_matches_hotplug_resolution() {
        let devices = vec![FakeDevice::disk(0, Some("usb")), FakeDevice::disk(1, Some("pci"))];
        let resolver = resolver();
        let enumeration = DeviceEnumerator::new(&resolver).enumerate(devices);
        let (bay, device) = &enumeration.bays[0];
        assert_eq!(resolver.resolve(device, enumeration.offset), BayIndex::Confirmed(i64::from(bay.get())));
    }

    #[test]
    fn test_project_lights_every_bay() {
        let resolver = resolver();
        let enumeration = DeviceEnumerator::new(&resolver).enumerate(vec![
            FakeDevice::disk(0, Some("pci")),
            FakeDevice::disk(2, Some("pci")),
        ]);
        let mut leds = RecordingLeds::default();
        {
            let mut projector = LedProjector::new(Some(&mut leds), LedColor::BLUE);
            enumeration.project(&mut projector);
        }
        assert_eq!(leds.bay_calls(), vec![(0, true), (2, true)]);
    }
}
