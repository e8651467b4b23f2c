use std::collections::BTreeMap;

use rand::Rng;

use crate::catalog::DeviceSchema;

pub const DEVICE_MODEL: &str = "Breezy T-1000";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceSerial(String);

impl DeviceSerial {
    /// `SN-` followed by six digits, 100000..=999999.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(format!("SN-{}", rng.gen_range(100_000..1_000_000)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewDevice {
    pub model: String,
    pub serial: DeviceSerial,
}

impl NewDevice {
    pub fn thermostat(serial: DeviceSerial) -> Self {
        Self { model: DEVICE_MODEL.to_string(), serial }
    }

    pub fn descriptor(&self) -> String {
        format!("Breezy Thermostat ({})", self.serial.as_str())
    }

    /// Property map keyed by the portal's device schema.
    pub fn properties(&self, schema: &DeviceSchema) -> BTreeMap<String, String> {
        BTreeMap::from([
            (schema.model_property.clone(), self.model.clone()),
            (schema.descriptor_property.clone(), self.descriptor()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::catalog::CrmCatalog;

    use super::{DeviceSerial, NewDevice};

    #[test]
    fn serials_are_six_digits_with_prefix() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            let serial = DeviceSerial::random(&mut rng);
            let digits = serial.as_str().strip_prefix("SN-").expect("prefix");
            assert_eq!(digits.len(), 6);
            let value: u32 = digits.parse().expect("numeric serial");
            assert!((100_000..1_000_000).contains(&value));
        }
    }

    #[test]
    fn properties_follow_the_device_schema() {
        let catalog = CrmCatalog::default();
        let device = NewDevice::thermostat(DeviceSerial("SN-123456".to_string()));
        let properties = device.properties(&catalog.device);

        assert_eq!(properties.get("model").map(String::as_str), Some("Breezy T-1000"));
        assert_eq!(
            properties.get("thermostat").map(String::as_str),
            Some("Breezy Thermostat (SN-123456)")
        );
    }
}
