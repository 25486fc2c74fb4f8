use std::collections::HashMap;

/// Expands `$VAR` and `${VAR}` references against `variables` and a leading `~`.
///
/// Unknown variables are left untouched, like the CI host does for its own templates.
pub fn expand_variables(template: &str, variables: &HashMap<String, String>) -> String {
    let expanded = shellexpand::env_with_context_no_errors(template, |name: &str| {
        variables.get(name).map(String::as_str)
    });
    shellexpand::tilde(expanded.as_ref()).into_owned()
}
