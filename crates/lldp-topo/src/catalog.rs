//! PCI vendor/device name catalog for common datacenter NICs.
//!
//! Identifiers are matched exactly as read from sysfs (`0x8086`), without
//! case normalization. Sources: <https://pci-ids.ucw.cz/read/PC> and the
//! DPDK PCI device id list.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Vendor name reported for identifiers missing from the catalog.
pub const UNKNOWN_VENDOR: &str = "UNKNOWN VENDOR";

/// Device name reported for identifiers missing from the catalog.
pub const UNKNOWN_DEVICE: &str = "UNKNOWN DEVICE";

struct Vendor {
    name: &'static str,
    devices: HashMap<&'static str, &'static str>,
}

static CATALOG: LazyLock<HashMap<&'static str, Vendor>> = LazyLock::new(|| {
    let vendors = [
        (
            "0x8086",
            "Intel",
            &[
                ("0x10fb", "Niantic IXGBE 82599 SFP"),
                ("0x1016", "e1000 82540EP_LOM"),
                ("0x1521", "e1000 I350 Copper"),
                ("0x1528", "Twinville IXGBE X540T"),
                ("0x154d", "Niantic IXGBE 82599 SFP_SF2"),
                ("0x1572", "Fortville XL710 SFP"),
                ("0x1583", "Fortville XL710 QSFP_A"),
                ("0x1584", "Fortville XL710 QSFP_B"),
                ("0x1585", "Fortville XL710 QSFP_C"),
                ("0x158b", "Fortville XXV710 for 25GbE SFP28"),
                ("0x37d2", "X722 for 10GBASE-T"),
            ][..],
        ),
        (
            "0x15b3",
            "Mellanox",
            &[
                ("0x1015", "MT27710 Family [ConnectX-4 Lx]"),
                ("0x1016", "MT27710 Family [ConnectX-4 Lx Virtual Function]"),
                ("0x1019", "MT28800 Family [ConnectX-5 Ex]"),
            ][..],
        ),
        (
            "0x14e4",
            "Broadcom",
            &[
                ("0x1657", "BCM5719"),
                ("0x165f", "BCM5120"),
                ("0x16d6", "BCM-57412 NextXtreme-E"),
                ("0x16d7", "BCM-57414 NextXtreme-E"),
            ][..],
        ),
    ];

    vendors
        .into_iter()
        .map(|(id, name, devices)| {
            (
                id,
                Vendor {
                    name,
                    devices: devices.iter().copied().collect(),
                },
            )
        })
        .collect()
});

/// Resolve vendor and device names for a pair of PCI identifiers.
///
/// Never fails: unknown vendors map to [`UNKNOWN_VENDOR`], unknown devices
/// (of known or unknown vendors) map to [`UNKNOWN_DEVICE`].
#[must_use]
pub fn lookup(vendor_id: &str, device_id: &str) -> (&'static str, &'static str) {
    match CATALOG.get(vendor_id) {
        Some(vendor) => (
            vendor.name,
            vendor
                .devices
                .get(device_id)
                .copied()
                .unwrap_or(UNKNOWN_DEVICE),
        ),
        None => (UNKNOWN_VENDOR, UNKNOWN_DEVICE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_vendor_and_device() {
        assert_eq!(
            lookup("0x8086", "0x10fb"),
            ("Intel", "Niantic IXGBE 82599 SFP")
        );
        assert_eq!(
            lookup("0x15b3", "0x1019"),
            ("Mellanox", "MT28800 Family [ConnectX-5 Ex]")
        );
        assert_eq!(lookup("0x14e4", "0x16d7"), ("Broadcom", "BCM-57414 NextXtreme-E"));
    }

    #[test]
    fn test_unknown_vendor() {
        assert_eq!(lookup("0x9999", "0x9999"), (UNKNOWN_VENDOR, UNKNOWN_DEVICE));
    }

    #[test]
    fn test_unknown_device_of_known_vendor() {
        assert_eq!(lookup("0x8086", "0xffff"), ("Intel", UNKNOWN_DEVICE));
    }

    #[test]
    fn test_same_device_id_under_different_vendors() {
        assert_eq!(lookup("0x8086", "0x1016").1, "e1000 82540EP_LOM");
        assert_eq!(
            lookup("0x15b3", "0x1016").1,
            "MT27710 Family [ConnectX-4 Lx Virtual Function]"
        );
    }

    #[test]
    fn test_identifiers_are_case_sensitive() {
        assert_eq!(lookup("0x8086", "0x10FB"), ("Intel", UNKNOWN_DEVICE));
    }
}
