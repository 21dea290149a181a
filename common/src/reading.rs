#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorSample {
    pub voltage: Option<f32>,
    pub current: Option<f32>,
    pub power: Option<f32>,
    pub energy: Option<f32>,
    pub frequency: Option<f32>,
    pub power_factor: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Reading {
    pub voltage: f32,
    pub current: f32,
    pub power: f32,
    pub energy: f32,
    pub frequency: f32,
    pub power_factor: f32,
}

impl Reading {
    // Invalid fields become 0.0 here; downstream consumers never see a
    // non-finite value and cannot tell an invalid reading from a true zero.
    pub fn from_sample(sample: SensorSample) -> Self {
        Self {
            voltage: coerce(sample.voltage),
            current: coerce(sample.current),
            power: coerce(sample.power),
            energy: coerce(sample.energy),
            frequency: coerce(sample.frequency),
            power_factor: coerce(sample.power_factor),
        }
    }
}

fn coerce(value: Option<f32>) -> f32 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn full_sample() -> SensorSample {
        SensorSample {
            voltage: Some(230.5),
            current: Some(1.2),
            power: Some(276.6),
            energy: Some(3.417),
            frequency: Some(50.0),
            power_factor: Some(0.95),
        }
    }

    #[test]
    fn valid_fields_pass_through_unchanged() {
        let reading = Reading::from_sample(full_sample());

        assert_eq!(
            reading,
            Reading {
                voltage: 230.5,
                current: 1.2,
                power: 276.6,
                energy: 3.417,
                frequency: 50.0,
                power_factor: 0.95,
            }
        );
    }

    #[test]
    fn invalid_current_only_coerces_current_only() {
        let mut sample = full_sample();
        sample.current = None;

        let reading = Reading::from_sample(sample);

        assert_eq!(reading.current, 0.0);
        assert_eq!(reading.voltage, 230.5);
        assert_eq!(reading.power, 276.6);
        assert_eq!(reading.energy, 3.417);
        assert_eq!(reading.frequency, 50.0);
        assert_eq!(reading.power_factor, 0.95);
    }

    #[test]
    fn non_finite_values_coerce_to_zero() {
        let mut sample = full_sample();
        sample.voltage = Some(f32::NAN);
        sample.frequency = Some(f32::INFINITY);
        sample.power_factor = Some(f32::NEG_INFINITY);

        let reading = Reading::from_sample(sample);

        assert_eq!(reading.voltage, 0.0);
        assert_eq!(reading.frequency, 0.0);
        assert_eq!(reading.power_factor, 0.0);
        assert_eq!(reading.current, 1.2);
    }

    #[test]
    fn all_invalid_yields_all_zeroes() {
        let reading = Reading::from_sample(SensorSample::default());

        assert_eq!(reading, Reading::default());
    }
}
