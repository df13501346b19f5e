/// Temperature, humidity and pressure as read from the environment sensor.
#[derive(Debug, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Ambient {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub pressure_hpa: f32,
}

/// A reading from a sensor that is fitted. A reading that fails the
/// plausibility check is kept as `Invalid` rather than being zeroed, so the
/// decision service can tell "0 °C" from "sensor broken".
#[derive(Debug, PartialEq, Copy, Clone)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AmbientReading {
    Valid(Ambient),
    Invalid,
}

const TEMPERATURE_C: (f32, f32) = (-40.0, 85.0);
const HUMIDITY_PCT: (f32, f32) = (0.0, 100.0);
const PRESSURE_HPA: (f32, f32) = (300.0, 1100.0);

fn within(value: f32, (low, high): (f32, f32)) -> bool {
    // NaN fails both comparisons.
    value >= low && value <= high
}

impl AmbientReading {
    pub fn checked(ambient: Ambient) -> Self {
        if within(ambient.temperature_c, TEMPERATURE_C)
            && within(ambient.humidity_pct, HUMIDITY_PCT)
            && within(ambient.pressure_hpa, PRESSURE_HPA)
        {
            AmbientReading::Valid(ambient)
        } else {
            AmbientReading::Invalid
        }
    }
}

pub trait AmbientSource {
    /// `None` when no sensor is fitted.
    fn read_ambient(&mut self) -> Option<AmbientReading>;
}

/// For boards without an environment sensor.
pub struct NoAmbient;

impl AmbientSource for NoAmbient {
    fn read_ambient(&mut self) -> Option<AmbientReading> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ambient(temperature_c: f32, humidity_pct: f32, pressure_hpa: f32) -> Ambient {
        Ambient {
            temperature_c,
            humidity_pct,
            pressure_hpa,
        }
    }

    #[test]
    fn plausible_readings_pass() {
        let reading = ambient(21.5, 55.0, 1013.2);
        assert_eq!(AmbientReading::checked(reading), AmbientReading::Valid(reading));
        assert_eq!(
            AmbientReading::checked(ambient(0.0, 0.0, 300.0)),
            AmbientReading::Valid(ambient(0.0, 0.0, 300.0))
        );
    }

    #[test]
    fn implausible_readings_are_flagged() {
        assert_eq!(
            AmbientReading::checked(ambient(-273.0, 55.0, 1013.0)),
            AmbientReading::Invalid
        );
        assert_eq!(
            AmbientReading::checked(ambient(20.0, 120.0, 1013.0)),
            AmbientReading::Invalid
        );
        assert_eq!(
            AmbientReading::checked(ambient(20.0, 50.0, 0.0)),
            AmbientReading::Invalid
        );
        assert_eq!(
            AmbientReading::checked(ambient(f32::NAN, 50.0, 1000.0)),
            AmbientReading::Invalid
        );
    }

    #[test]
    fn no_sensor_reads_nothing() {
        assert_eq!(NoAmbient.read_ambient(), None);
    }
}
