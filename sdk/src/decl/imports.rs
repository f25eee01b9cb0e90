//! Per-file import tables

use crate::resolver::PackageResolve;
use crate::syntax::GoSource;

use super::types::{ImportInfo, ImportTable};

/// Build the import table of a file.
///
/// Every import is reachable under its explicit alias (if any) and under the
/// package name it declares, so both `db.Row` and `storage.Row` resolve when
/// `db "example.com/shop/storage"` is imported. Blank and dot imports are
/// reachable by declared name only.
pub fn build_import_table(source: &GoSource, resolver: &dyn PackageResolve) -> ImportTable {
    let mut table = ImportTable::default();

    for spec in source.imports() {
        let name = resolver.package_name(&spec.path);
        let alias = spec.name.filter(|alias| alias != "_" && alias != ".");

        let info = ImportInfo {
            path: spec.path,
            alias: alias.clone(),
            name: name.clone(),
        };
        if let Some(alias) = alias {
            table.insert(alias, info.clone());
        }
        table.insert(name, info);
    }

    table
}
