use crate::context::ExecutionContext;

/// Substitute `%name%` placeholders from context variables.
///
/// Chain-local variables win over script globals. An unresolved placeholder
/// is left verbatim, including its percent signs; a lone `%` with no closing
/// partner is copied through untouched.
pub fn interpolate(input: &str, ctx: &ExecutionContext) -> String {
    if !input.contains('%') {
        return input.to_string();
    }

    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('%') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) => {
                let name = &after[..end];
                match ctx.var(name) {
                    Some(value) => out.push_str(&value.to_string()),
                    None => {
                        out.push('%');
                        out.push_str(name);
                        out.push('%');
                    }
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support::test_context;
    use crate::value::Value;

    #[test]
    fn test_substitutes_known_variables() {
        let (mut ctx, _rx) = test_context();
        ctx.set_var("name", Value::from("Ann"));
        ctx.set_var("count", Value::Int(3));
        assert_eq!(
            interpolate("Hello %name%, you have %count%!", &ctx),
            "Hello Ann, you have 3!"
        );
    }

    #[test]
    fn test_missing_variable_stays_verbatim() {
        let (ctx, _rx) = test_context();
        assert_eq!(interpolate("oops %missing% here", &ctx), "oops %missing% here");
    }

    #[test]
    fn test_globals_fill_in_behind_locals() {
        let (mut ctx, _rx) = test_context();
        ctx.set_global("name", Value::from("global"));
        assert_eq!(interpolate("%name%", &ctx), "global");
        ctx.set_var("name", Value::from("local"));
        assert_eq!(interpolate("%name%", &ctx), "local");
    }

    #[test]
    fn test_unpaired_percent_passes_through() {
        let (ctx, _rx) = test_context();
        assert_eq!(interpolate("100% done", &ctx), "100% done");
    }
}
