//! Identifier case conversion for rendered declarations

/// Convert a snake_case identifier to camelCase.
///
/// Leading underscores are preserved; consecutive underscores collapse.
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for (i, ch) in name.chars().enumerate() {
        if ch == '_' {
            if out.is_empty() && i == 0 {
                out.push(ch);
            } else {
                upper_next = true;
            }
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_camel_case() {
        assert_eq!(to_camel_case("inc_value"), "incValue");
        assert_eq!(to_camel_case("test_of_exception_suppression"), "testOfExceptionSuppression");
        assert_eq!(to_camel_case("already"), "already");
        assert_eq!(to_camel_case("a__b"), "aB");
        assert_eq!(to_camel_case("_private_field"), "_privateField");
    }
}
