//! Data line parsing

use log::debug;
use meter_core::{MeterError, MeterResult, RegisterValue};

/// One data line of a readout, split into code and value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLine {
    pub key: String,
    pub value: String,
}

impl DataLine {
    /// Parse `code(value)` into its parts
    ///
    /// The line is split on the first `'('` and the value runs up to the next
    /// `')'`. A line without `'('` is kept whole under the synthetic key
    /// `#<index>`. A trailing CR left by CR LF line endings is dropped.
    pub fn parse(line: &str, index: usize) -> MeterResult<Self> {
        let line = line.trim_end_matches('\r');
        let Some(open) = line.find('(') else {
            debug!("Line {index} has no value group, storing as #{index}");
            return Ok(Self {
                key: format!("#{index}"),
                value: line.to_string(),
            });
        };

        let rest = &line[open + 1..];
        let close = rest.find(')').ok_or_else(|| {
            MeterError::MalformedFrame(format!("unterminated value group in line {line:?}"))
        })?;

        Ok(Self {
            key: line[..open].to_string(),
            value: rest[..close].to_string(),
        })
    }

    /// Unit suffix of the value, e.g. `kWh` in `0009032*kWh`
    pub fn unit(&self) -> Option<&str> {
        self.value
            .split_once('*')
            .map(|(_, unit)| unit)
            .filter(|unit| !unit.is_empty())
    }
}

impl From<DataLine> for RegisterValue {
    fn from(line: DataLine) -> Self {
        RegisterValue::new(line.key, line.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_obis_line() {
        let line = DataLine::parse("0.0(12345678)", 2).unwrap();
        assert_eq!(line.key, "0.0");
        assert_eq!(line.value, "12345678");
        assert_eq!(line.unit(), None);
    }

    #[test]
    fn test_parse_line_with_unit() {
        let line = DataLine::parse("1.20(0009032*kWh)", 3).unwrap();
        assert_eq!(line.key, "1.20");
        assert_eq!(line.value, "0009032*kWh");
        assert_eq!(line.unit(), Some("kWh"));
    }

    #[test]
    fn test_parse_terminator_line() {
        let line = DataLine::parse("1.6*1(000002,8)!", 9).unwrap();
        assert_eq!(line.key, "1.6*1");
        assert_eq!(line.value, "000002,8");
    }

    #[test]
    fn test_parse_line_without_group() {
        let line = DataLine::parse("!", 7).unwrap();
        assert_eq!(line.key, "#7");
        assert_eq!(line.value, "!");
    }

    #[test]
    fn test_parse_cr_terminated_line() {
        let line = DataLine::parse("1.20(0009032*kWh)\r", 3).unwrap();
        assert_eq!(line.key, "1.20");
        assert_eq!(line.value, "0009032*kWh");

        let line = DataLine::parse("!\r", 10).unwrap();
        assert_eq!(line.key, "#10");
        assert_eq!(line.value, "!");
    }

    #[test]
    fn test_parse_splits_on_first_paren() {
        let line = DataLine::parse("1.6(000001,5*kW)(2310011200)", 4).unwrap();
        assert_eq!(line.key, "1.6");
        assert_eq!(line.value, "000001,5*kW");
    }

    #[test]
    fn test_parse_unterminated_group() {
        let result = DataLine::parse("0.0(1234", 2);
        assert!(matches!(result, Err(MeterError::MalformedFrame(_))));
    }

    #[test]
    fn test_into_register_value() {
        let value: RegisterValue = DataLine::parse("0.0(12345678)", 2).unwrap().into();
        assert_eq!(value.name, "0.0");
        assert_eq!(value.value, "12345678");
    }
}
