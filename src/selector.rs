// Filter-string builders for cluster list queries
//
// Selectors are declarative fragments ("metadata.name=worker-1", "app=web")
// that get comma-joined into the single filter expression the cluster API
// expects. No escaping is performed. An empty fragment list yields an empty
// string, which the API treats as "no filter".

/// Join filter fragments with `,` into one filter expression.
pub fn build_filter(fragments: &[String]) -> String {
    build_named_filter(fragments, "")
}

/// Join `names` with `,`, prefixing each one.
///
/// Used to build an identity filter over an explicit allow-list, e.g.
/// `build_named_filter(&nodes, "metadata.name=")` selects exactly the named
/// set of nodes.
pub fn build_named_filter(names: &[String], prefix: &str) -> String {
    let mut filter = String::new();
    for name in names {
        if !filter.is_empty() {
            filter.push(',');
        }
        filter.push_str(prefix);
        filter.push_str(name);
    }
    filter
}
