// SPDX-License-Identifier: MIT
//
// Key schema.
//
// Every piece of document state lives under a deterministic key. Per-row
// keys are `<row>:<field>`; everything else is global.
//
//   <row>:line               styled cells of the row's text
//   <row>:parents            parent row ids (set semantics, insertion order)
//   <row>:children           ordered child row ids
//   <row>:detached_parent    where a fully detached row used to live
//   <row>:detached_children  rows that were fully detached from <row>
//   <row>:collapsed          collapse flag
//   <row>:plugin:<ns>        plugin-attached metadata
//
//   lastID                   highest allocated row id
//   lastViewRoot             ancestry of the last zoomed-into row
//   macros                   { register: [key tokens] }
//   settings:<name>          one setting
//   plugin:<ns>:<key>        global plugin data
//   plugins                  registered plugin namespaces
//   lastSave                 write stamp for multiple-writer detection

/// Highest allocated row id.
pub const LAST_ID: &str = "lastID";
/// Ancestry of the last view root.
pub const LAST_VIEW_ROOT: &str = "lastViewRoot";
/// Recorded macros.
pub const MACROS: &str = "macros";
/// Write stamp of the last session that wrote.
pub const LAST_SAVE: &str = "lastSave";
/// Plugin namespaces with per-row data.
pub const PLUGINS: &str = "plugins";

#[must_use]
pub fn line(row: u64) -> String {
    format!("{row}:line")
}

#[must_use]
pub fn parents(row: u64) -> String {
    format!("{row}:parents")
}

#[must_use]
pub fn children(row: u64) -> String {
    format!("{row}:children")
}

#[must_use]
pub fn detached_parent(row: u64) -> String {
    format!("{row}:detached_parent")
}

#[must_use]
pub fn detached_children(row: u64) -> String {
    format!("{row}:detached_children")
}

#[must_use]
pub fn collapsed(row: u64) -> String {
    format!("{row}:collapsed")
}

/// Plugin metadata attached to one row.
#[must_use]
pub fn row_plugin(row: u64, namespace: &str) -> String {
    format!("{row}:plugin:{namespace}")
}

/// One named setting.
#[must_use]
pub fn setting(name: &str) -> String {
    format!("settings:{name}")
}

/// Global plugin data.
#[must_use]
pub fn plugin(namespace: &str, key: &str) -> String {
    format!("plugin:{namespace}:{key}")
}

/// Every per-row key, for purging a row.
#[must_use]
pub fn all_row_keys(row: u64) -> [String; 6] {
    [
        line(row),
        parents(row),
        children(row),
        detached_parent(row),
        detached_children(row),
        collapsed(row),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_keys() {
        assert_eq!(line(7), "7:line");
        assert_eq!(children(0), "0:children");
        assert_eq!(row_plugin(3, "marks"), "3:plugin:marks");
        assert_eq!(all_row_keys(2).len(), 6);
    }

    #[test]
    fn global_keys() {
        assert_eq!(setting("hotkeys"), "settings:hotkeys");
        assert_eq!(plugin("marks", "index"), "plugin:marks:index");
    }
}
