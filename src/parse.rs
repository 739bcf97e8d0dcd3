//! Instruction-string tokenization shared by every instruction family.

use crate::error::ParseError;
use crate::types::{Operand, ValueType};

/// Separates the fields of an instruction string.
pub const FIELD_DELIM: char = '°';
/// Separates an operand name from its value type.
pub const VALUE_TYPE_DELIM: char = ':';
/// Optional execution-type prefix emitted by the compiler for in-process instructions.
pub const EXEC_TYPE_CP: &str = "CP";

/// Splits `istr` into trimmed fields, dropping a leading `CP` exec-type field.
/// The opcode is the first returned field.
pub fn instruction_parts(istr: &str) -> Result<Vec<&str>, ParseError> {
    let trimmed = istr.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }
    let mut parts: Vec<&str> = trimmed.split(FIELD_DELIM).map(str::trim).collect();
    if parts.len() > 1 && parts[0].eq_ignore_ascii_case(EXEC_TYPE_CP) {
        parts.remove(0);
    }
    if parts[0].is_empty() {
        return Err(ParseError::Empty);
    }
    Ok(parts)
}

/// Fails with `FieldCount` unless `parts` holds the opcode plus `operands` fields.
pub fn check_field_count(parts: &[&str], operands: usize) -> Result<(), ParseError> {
    let expected = operands + 1;
    if parts.len() != expected {
        return Err(ParseError::FieldCount {
            opcode: parts.first().copied().unwrap_or_default().to_string(),
            expected,
            actual: parts.len(),
        });
    }
    Ok(())
}

/// Parses a `name:valuetype` operand field.
pub fn parse_operand(field: &str) -> Result<Operand, ParseError> {
    let (name, vt) =
        field
            .rsplit_once(VALUE_TYPE_DELIM)
            .ok_or_else(|| ParseError::InvalidOperand {
                field: field.to_string(),
                reason: format!("expected `name{VALUE_TYPE_DELIM}valuetype`"),
            })?;
    let name = name.trim();
    if name.is_empty() {
        return Err(ParseError::InvalidOperand {
            field: field.to_string(),
            reason: "empty operand name".to_string(),
        });
    }
    if name.chars().any(|c| c.is_whitespace() || c == VALUE_TYPE_DELIM) {
        return Err(ParseError::InvalidOperand {
            field: field.to_string(),
            reason: format!("operand name `{name}` contains a reserved character"),
        });
    }
    let value_type = ValueType::parse(vt).ok_or_else(|| ParseError::UnknownValueType {
        field: field.to_string(),
        token: vt.to_string(),
    })?;
    Ok(Operand::new(name, value_type))
}

/// Joins fields back into the wire form.
pub fn join_fields<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for (idx, field) in fields.into_iter().enumerate() {
        if idx > 0 {
            out.push(FIELD_DELIM);
        }
        out.push_str(field.as_ref());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parts_drop_exec_type_and_trim() {
        let parts = instruction_parts(" CP°uaggouterchain° uak+ °<°A:double°B:double°s:double ")
            .expect("well formed");
        assert_eq!(
            parts,
            vec!["uaggouterchain", "uak+", "<", "A:double", "B:double", "s:double"]
        );
    }

    #[test]
    fn empty_strings_are_rejected() {
        assert_eq!(instruction_parts("   "), Err(ParseError::Empty));
        assert_eq!(instruction_parts("CP°"), Err(ParseError::Empty));
    }

    #[test]
    fn operand_value_types_are_case_insensitive() {
        let op = parse_operand("X:DOUBLE").expect("valid");
        assert_eq!(op, Operand::new("X", ValueType::Double));
        assert_eq!(op.to_string(), "X:double");
    }

    #[test]
    fn malformed_operands_name_the_field() {
        assert!(matches!(
            parse_operand("X"),
            Err(ParseError::InvalidOperand { field, .. }) if field == "X"
        ));
        assert!(matches!(
            parse_operand(":int"),
            Err(ParseError::InvalidOperand { .. })
        ));
        assert!(matches!(
            parse_operand("X:complex"),
            Err(ParseError::UnknownValueType { token, .. }) if token == "complex"
        ));
    }

    #[test]
    fn field_count_reports_expected_and_actual() {
        let err = check_field_count(&["uaggouterchain", "uak+"], 5).expect_err("short");
        assert_eq!(
            err,
            ParseError::FieldCount {
                opcode: "uaggouterchain".to_string(),
                expected: 6,
                actual: 2
            }
        );
    }
}
