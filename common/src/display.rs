use crate::reading::Reading;

pub const PAGE_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayPage {
    Voltage,
    Current,
    Power,
    Energy,
    Frequency,
    PowerFactor,
}

impl DisplayPage {
    pub fn index(self) -> usize {
        match self {
            Self::Voltage => 0,
            Self::Current => 1,
            Self::Power => 2,
            Self::Energy => 3,
            Self::Frequency => 4,
            Self::PowerFactor => 5,
        }
    }

    pub fn from_index(index: usize) -> Self {
        match index % PAGE_COUNT {
            0 => Self::Voltage,
            1 => Self::Current,
            2 => Self::Power,
            3 => Self::Energy,
            4 => Self::Frequency,
            _ => Self::PowerFactor,
        }
    }

    pub fn next(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    // POWER FACTOR is the only two-line heading; the others fit on one.
    pub fn label_lines(self) -> &'static [&'static str] {
        match self {
            Self::Voltage => &["VOLTAGE"],
            Self::Current => &["CURRENT"],
            Self::Power => &["POWER"],
            Self::Energy => &["ENERGY"],
            Self::Frequency => &["FREQUENCY"],
            Self::PowerFactor => &["POWER", "FACTOR"],
        }
    }

    pub fn unit(self) -> Option<&'static str> {
        match self {
            Self::Voltage => Some("V"),
            Self::Current => Some("A"),
            Self::Power => Some("W"),
            Self::Energy => Some("kWh"),
            Self::Frequency => Some("Hz"),
            Self::PowerFactor => None,
        }
    }

    pub fn value_text(self, reading: &Reading) -> String {
        match self {
            Self::Voltage => format!("{:.1}", reading.voltage),
            Self::Current => format!("{:.2}", reading.current),
            Self::Power => format!("{:.1}", reading.power),
            Self::Energy => format!("{:.2}", reading.energy),
            Self::Frequency => format!("{:.1}", reading.frequency),
            Self::PowerFactor => format!("{:.2}", reading.power_factor),
        }
    }

    pub fn view(self, reading: &Reading) -> PageView {
        PageView {
            page: self,
            labels: self.label_lines(),
            value: self.value_text(reading),
            unit: self.unit(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub page: DisplayPage,
    pub labels: &'static [&'static str],
    pub value: String,
    pub unit: Option<&'static str>,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn pages_cycle_in_order() {
        let mut page = DisplayPage::Voltage;
        let mut seen = Vec::new();

        for _ in 0..8 {
            seen.push(page.index());
            page = page.next();
        }

        assert_eq!(seen, vec![0, 1, 2, 3, 4, 5, 0, 1]);
    }

    #[test]
    fn index_round_trips() {
        for index in 0..PAGE_COUNT {
            assert_eq!(DisplayPage::from_index(index).index(), index);
        }
        assert_eq!(DisplayPage::from_index(7), DisplayPage::Current);
    }

    #[test]
    fn layouts_match_page_table() {
        let reading = Reading {
            voltage: 230.5,
            current: 1.2,
            power: 276.6,
            energy: 3.417,
            frequency: 50.0,
            power_factor: 0.95,
        };

        let expected = [
            (vec!["VOLTAGE"], "230.5", Some("V")),
            (vec!["CURRENT"], "1.20", Some("A")),
            (vec!["POWER"], "276.6", Some("W")),
            (vec!["ENERGY"], "3.42", Some("kWh")),
            (vec!["FREQUENCY"], "50.0", Some("Hz")),
            (vec!["POWER", "FACTOR"], "0.95", None),
        ];

        for (index, (labels, value, unit)) in expected.iter().enumerate() {
            let view = DisplayPage::from_index(index).view(&reading);
            assert_eq!(view.labels, labels.as_slice());
            assert_eq!(view.value, *value);
            assert_eq!(view.unit, *unit);
        }
    }

    #[test]
    fn zero_values_keep_fixed_precision() {
        let reading = Reading::default();

        assert_eq!(DisplayPage::Voltage.value_text(&reading), "0.0");
        assert_eq!(DisplayPage::Current.value_text(&reading), "0.00");
        assert_eq!(DisplayPage::Energy.value_text(&reading), "0.00");
    }
}
