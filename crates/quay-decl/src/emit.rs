//! Deterministic declaration emission
//!
//! Input order is insignificant: declarations are resolved against a
//! global ownership map, ordered topologically within each module with
//! lexical tie-breaking, and rendered with sorted imports. Re-running on
//! any permutation of the same input produces byte-identical output.

use crate::case::to_camel_case;
use crate::graph::{DeclKind, ModuleDecls, TypeDecl};
use crate::EmitError;
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Rendering options.
#[derive(Debug, Clone, Default)]
pub struct EmitOptions {
    /// Render interface field names in camelCase
    pub camel_case_fields: bool,
}

/// One rendered output module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedModule {
    /// Module name; the output file is `<name>.ts`
    pub name: String,
    /// Rendered TypeScript source
    pub source: String,
}

/// Emit every module with default options.
pub fn emit(modules: &[ModuleDecls]) -> Result<Vec<RenderedModule>, EmitError> {
    emit_with(modules, &EmitOptions::default())
}

/// Emit every module.
///
/// Fails if a type is defined in more than one place or a reference has no
/// owning module.
pub fn emit_with(
    modules: &[ModuleDecls],
    options: &EmitOptions,
) -> Result<Vec<RenderedModule>, EmitError> {
    let owners = resolve_owners(modules)?;

    let mut rendered = Vec::with_capacity(modules.len());
    for module in modules {
        rendered.push(render_module(module, &owners, options)?);
    }
    // Output order is the module list order the caller chose; within each
    // module everything is normalized
    Ok(rendered)
}

/// Write rendered modules to a directory as `<name>.ts` files plus an
/// `index.ts` re-exporting every module.
pub fn write_to(rendered: &[RenderedModule], dir: &Path) -> Result<(), EmitError> {
    fs::create_dir_all(dir)?;
    let mut names: Vec<&str> = rendered.iter().map(|m| m.name.as_str()).collect();
    names.sort_unstable();

    for module in rendered {
        fs::write(dir.join(format!("{}.ts", module.name)), &module.source)?;
    }

    let mut index = String::new();
    for name in names {
        index.push_str(&format!("export * from \"./{}\";\n", name));
    }
    fs::write(dir.join("index.ts"), index)?;
    Ok(())
}

/// Build the name → owning module map, rejecting duplicates.
fn resolve_owners(modules: &[ModuleDecls]) -> Result<FxHashMap<String, String>, EmitError> {
    let mut owners: FxHashMap<String, String> = FxHashMap::default();
    for module in modules {
        for decl in &module.decls {
            if let Some(first) = owners.get(&decl.name) {
                return Err(EmitError::DuplicateDefinition {
                    name: decl.name.clone(),
                    first: first.clone(),
                    second: module.name.clone(),
                });
            }
            owners.insert(decl.name.clone(), module.name.clone());
        }
    }
    Ok(owners)
}

fn render_module(
    module: &ModuleDecls,
    owners: &FxHashMap<String, String>,
    options: &EmitOptions,
) -> Result<RenderedModule, EmitError> {
    // Import edges: every reference owned elsewhere, grouped per module
    let mut imports: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for decl in &module.decls {
        for reference in decl.references() {
            match owners.get(&reference) {
                Some(owner) if *owner == module.name => {}
                Some(owner) => {
                    imports
                        .entry(owner.clone())
                        .or_default()
                        .insert(reference);
                }
                None => {
                    return Err(EmitError::Unresolved {
                        name: reference,
                        module: module.name.clone(),
                    })
                }
            }
        }
    }

    let ordered = order_decls(&module.decls);

    let mut source = String::new();
    for (from, entities) in &imports {
        let list: Vec<&str> = entities.iter().map(String::as_str).collect();
        source.push_str(&format!(
            "import {{ {} }} from \"./{}\";\n",
            list.join(", "),
            from
        ));
    }
    if !imports.is_empty() {
        source.push('\n');
    }

    for (i, decl) in ordered.iter().enumerate() {
        if i > 0 {
            source.push('\n');
        }
        render_decl(decl, options, &mut source);
    }

    Ok(RenderedModule {
        name: module.name.clone(),
        source,
    })
}

/// Order declarations topologically by in-module references, breaking ties
/// (and cycles) lexically. The result depends only on the declaration set,
/// never on input order.
fn order_decls(decls: &[TypeDecl]) -> Vec<&TypeDecl> {
    let by_name: BTreeMap<&str, &TypeDecl> =
        decls.iter().map(|d| (d.name.as_str(), d)).collect();

    // In-module dependency edges only; cross-module references are imports
    let mut pending: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for decl in by_name.values() {
        let deps: BTreeSet<&str> = decl
            .references()
            .into_iter()
            .filter_map(|r| by_name.get_key_value(r.as_str()).map(|(k, _)| *k))
            .filter(|dep| *dep != decl.name.as_str())
            .collect();
        pending.insert(decl.name.as_str(), deps);
    }

    let mut ordered = Vec::with_capacity(decls.len());
    while !pending.is_empty() {
        // Lexically smallest declaration with no unemitted dependencies;
        // if none exists the remainder is cyclic, and the lexically
        // smallest node breaks the cycle (forward references are legal in
        // the output language)
        let next = pending
            .iter()
            .find(|(_, deps)| deps.is_empty())
            .map(|(name, _)| *name)
            .unwrap_or_else(|| {
                *pending
                    .keys()
                    .next()
                    .expect("pending cannot be empty inside the loop")
            });
        pending.remove(next);
        for deps in pending.values_mut() {
            deps.remove(next);
        }
        ordered.push(by_name[next]);
    }
    ordered
}

fn render_decl(decl: &TypeDecl, options: &EmitOptions, out: &mut String) {
    match &decl.kind {
        DeclKind::Interface { fields } => {
            out.push_str(&format!("export interface {} {{\n", decl.name));
            for (name, type_ref) in fields {
                let name = if options.camel_case_fields {
                    to_camel_case(name)
                } else {
                    name.clone()
                };
                out.push_str(&format!("    {}: {};\n", name, type_ref.render()));
            }
            out.push_str("}\n");
        }
        DeclKind::Enum { variants } => {
            let plain = variants.iter().all(|(_, payload)| payload.is_none());
            if plain {
                // Ordinals are declaration positions, stated explicitly so
                // they stay stable whatever order the renderer chose
                out.push_str(&format!("export enum {} {{\n", decl.name));
                for (ordinal, (name, _)) in variants.iter().enumerate() {
                    out.push_str(&format!("    {} = {},\n", name, ordinal));
                }
                out.push_str("}\n");
            } else {
                out.push_str(&format!("export type {} =", decl.name));
                for (name, payload) in variants {
                    let payload = match payload {
                        Some(type_ref) => type_ref.render(),
                        None => "null".to_string(),
                    };
                    out.push_str(&format!("\n    | {{ {}: {} }}", name, payload));
                }
                out.push_str(";\n");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::TypeRef;

    fn data_modules() -> Vec<ModuleDecls> {
        vec![
            ModuleDecls::new(
                "data",
                vec![
                    TypeDecl::interface(
                        "AsyncDataB",
                        [
                            ("a", TypeRef::named("AsyncDataA")),
                            ("b", TypeRef::array(TypeRef::named("AsyncDataA"))),
                            ("c", TypeRef::map(TypeRef::named("AsyncDataA"))),
                            ("d", TypeRef::option(TypeRef::String)),
                        ],
                    ),
                    TypeDecl::interface(
                        "AsyncDataA",
                        [
                            ("a", TypeRef::Number),
                            ("b", TypeRef::Number),
                            ("c", TypeRef::String),
                        ],
                    ),
                ],
            ),
            ModuleDecls::new(
                "errors",
                vec![TypeDecl::interface(
                    "ErrorC",
                    [
                        ("msg", TypeRef::String),
                        ("code", TypeRef::Number),
                        ("data", TypeRef::option(TypeRef::named("AsyncDataA"))),
                    ],
                )],
            ),
        ]
    }

    #[test]
    fn test_dependency_order_within_module() {
        let rendered = emit(&data_modules()).unwrap();
        let data = &rendered[0].source;
        let a = data.find("export interface AsyncDataA").unwrap();
        let b = data.find("export interface AsyncDataB").unwrap();
        assert!(a < b, "referenced type must precede its user:\n{}", data);
    }

    #[test]
    fn test_cross_module_reference_becomes_import() {
        let rendered = emit(&data_modules()).unwrap();
        let errors = &rendered[1].source;
        assert!(errors.starts_with("import { AsyncDataA } from \"./data\";\n"));
        assert!(errors.contains("data: AsyncDataA | null;"));
    }

    #[test]
    fn test_order_independence() {
        let modules = data_modules();
        let mut reordered = modules.clone();
        reordered[0].decls.reverse();
        reordered[1].decls.reverse();

        let first = emit(&modules).unwrap();
        let second = emit(&reordered).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_forward_reference_in_input_order() {
        // The user appears before its dependency in the input
        let modules = vec![ModuleDecls::new(
            "m",
            vec![
                TypeDecl::interface("Uses", [("dep", TypeRef::named("Used"))]),
                TypeDecl::interface("Used", [("x", TypeRef::Number)]),
            ],
        )];
        let rendered = emit(&modules).unwrap();
        let source = &rendered[0].source;
        assert!(source.find("Used").unwrap() < source.find("Uses").unwrap());
    }

    #[test]
    fn test_duplicate_definition_rejected() {
        let modules = vec![
            ModuleDecls::new("a", vec![TypeDecl::interface("X", [("v", TypeRef::Number)])]),
            ModuleDecls::new("b", vec![TypeDecl::interface("X", [("v", TypeRef::Number)])]),
        ];
        assert!(matches!(
            emit(&modules),
            Err(EmitError::DuplicateDefinition { name, .. }) if name == "X"
        ));
    }

    #[test]
    fn test_unresolved_reference_rejected() {
        let modules = vec![ModuleDecls::new(
            "a",
            vec![TypeDecl::interface("X", [("v", TypeRef::named("Missing"))])],
        )];
        assert!(matches!(
            emit(&modules),
            Err(EmitError::Unresolved { name, .. }) if name == "Missing"
        ));
    }

    #[test]
    fn test_plain_enum_ordinals_follow_declaration_order() {
        let modules = vec![ModuleDecls::new(
            "m",
            vec![TypeDecl::enumeration::<_, &str>(
                "WorkerState",
                [
                    ("Created", None),
                    ("Running", None),
                    ("ShuttingDown", None),
                    ("Terminated", None),
                ],
            )],
        )];
        let rendered = emit(&modules).unwrap();
        let source = &rendered[0].source;
        assert!(source.contains("Created = 0,"));
        assert!(source.contains("Running = 1,"));
        assert!(source.contains("ShuttingDown = 2,"));
        assert!(source.contains("Terminated = 3,"));
    }

    #[test]
    fn test_payload_enum_renders_as_tag_union() {
        let modules = vec![ModuleDecls::new(
            "m",
            vec![TypeDecl::enumeration(
                "Command",
                [
                    ("IncValue", Some(TypeRef::Number)),
                    ("Shutdown", None),
                ],
            )],
        )];
        let rendered = emit(&modules).unwrap();
        let source = &rendered[0].source;
        assert!(source.contains("export type Command ="));
        assert!(source.contains("| { IncValue: number }"));
        assert!(source.contains("| { Shutdown: null }"));
    }

    #[test]
    fn test_camel_case_fields_option() {
        let modules = vec![ModuleDecls::new(
            "m",
            vec![TypeDecl::interface(
                "Struct",
                [("inc_value", TypeRef::Number)],
            )],
        )];
        let rendered = emit_with(
            &modules,
            &EmitOptions {
                camel_case_fields: true,
            },
        )
        .unwrap();
        assert!(rendered[0].source.contains("incValue: number;"));
    }

    #[test]
    fn test_mutual_references_break_deterministically() {
        let make = |order: bool| {
            let mut decls = vec![
                TypeDecl::interface("Alpha", [("b", TypeRef::named("Beta"))]),
                TypeDecl::interface("Beta", [("a", TypeRef::option(TypeRef::named("Alpha")))]),
            ];
            if order {
                decls.reverse();
            }
            vec![ModuleDecls::new("m", decls)]
        };
        let first = emit(&make(false)).unwrap();
        let second = emit(&make(true)).unwrap();
        assert_eq!(first, second);
        // The cycle breaks at the lexically smallest name
        let source = &first[0].source;
        assert!(source.find("Alpha").unwrap() < source.find("interface Beta").unwrap());
    }

    #[test]
    fn test_write_to_produces_files_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let rendered = emit(&data_modules()).unwrap();
        write_to(&rendered, dir.path()).unwrap();

        let data = std::fs::read_to_string(dir.path().join("data.ts")).unwrap();
        assert!(data.contains("export interface AsyncDataA"));
        let index = std::fs::read_to_string(dir.path().join("index.ts")).unwrap();
        assert_eq!(
            index,
            "export * from \"./data\";\nexport * from \"./errors\";\n"
        );

        // Idempotent: writing a reordered emission changes nothing
        let mut reordered = data_modules();
        reordered[0].decls.reverse();
        write_to(&emit(&reordered).unwrap(), dir.path()).unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("data.ts")).unwrap(),
            data
        );
    }
}
