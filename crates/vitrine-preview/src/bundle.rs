//! Virtual file set for the in-browser preview sandbox

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::debug;

use vitrine_registry::Showcase;
use vitrine_scan::{
    extract_component_names, merge_dependencies, remove_component_imports, scan, COMPONENT_MODULE,
};

pub const ENTRY_PATH: &str = "/App.tsx";
pub const DEMO_PATH: &str = "/Demo.tsx";
pub const COMPONENT_PATH: &str = "/Component.tsx";
pub const UTILS_PATH: &str = "/lib/utils.ts";
pub const TSCONFIG_PATH: &str = "/tsconfig.json";
pub const TAILWIND_CONFIG_PATH: &str = "/tailwind.config.js";
pub const GLOBAL_CSS_PATH: &str = "/globals.css";
pub const COMPILED_CSS_PATH: &str = "/compiled.css";

/// Version of `react` / `react-dom` when no file asks for one.
pub const DEFAULT_REACT_VERSION: &str = "^18.2.0";

const UTILS_SOURCE: &str = "export function cn(...inputs: (string | undefined | null | false)[]) {
  return inputs.filter(Boolean).join(' ');
}
";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BundleError {
    #[error("demo code has no export to render")]
    NoRenderableExport,
}

/// Sources for one preview.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewInput {
    pub code: String,
    pub demo_code: String,
    /// Resolved registry files by path
    #[serde(default)]
    pub registry_files: BTreeMap<String, String>,
    #[serde(default)]
    pub component_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub demo_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub registry_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub tailwind_config: Option<String>,
    #[serde(default)]
    pub global_css: Option<String>,
    #[serde(default)]
    pub compiled_css: Option<String>,
    /// Stylesheet URLs handed to the sandbox as is
    #[serde(default)]
    pub stylesheets: Vec<String>,
}

impl PreviewInput {
    pub fn from_showcase(showcase: &Showcase, stylesheets: Vec<String>) -> Self {
        Self {
            code: showcase.code.clone(),
            demo_code: showcase.demo_code.clone(),
            registry_files: showcase.registry.files(),
            component_dependencies: showcase.component.dependencies.clone(),
            demo_dependencies: showcase.demo.demo_dependencies.clone(),
            registry_dependencies: showcase.registry.npm_dependencies.clone(),
            tailwind_config: showcase.tailwind_config.clone(),
            global_css: showcase.global_css.clone(),
            compiled_css: showcase.compiled_css.clone(),
            stylesheets,
        }
    }
}

/// What the sandbox consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewBundle {
    pub files: BTreeMap<String, String>,
    pub dependencies: BTreeMap<String, String>,
    pub external_resources: Vec<String>,
    pub entry: String,
}

/// How the entry file reaches the demo.
#[derive(Debug, Clone, PartialEq, Eq)]
enum DemoEntry {
    Named(Vec<String>),
    Default,
}

/// Builds the preview file set. Pure: no I/O.
pub fn assemble(input: &PreviewInput) -> Result<PreviewBundle, BundleError> {
    let entry = demo_entry(&input.demo_code)?;
    let component_names = extract_component_names(&input.code);

    let mut files = BTreeMap::new();

    // registry files first so fixed files win on a shared path
    for (path, code) in &input.registry_files {
        files.insert(path.clone(), code.clone());
    }

    files.insert(ENTRY_PATH.to_string(), render_entry(&entry));
    files.insert(DEMO_PATH.to_string(), render_demo(&input.demo_code, &component_names));
    files.insert(COMPONENT_PATH.to_string(), input.code.clone());
    files.insert(UTILS_PATH.to_string(), UTILS_SOURCE.to_string());
    files.insert(TSCONFIG_PATH.to_string(), tsconfig());

    let optional = [
        (TAILWIND_CONFIG_PATH, &input.tailwind_config),
        (GLOBAL_CSS_PATH, &input.global_css),
        (COMPILED_CSS_PATH, &input.compiled_css),
    ];
    for (path, content) in optional {
        if let Some(content) = content {
            files.insert(path.to_string(), content.clone());
        }
    }

    let mut dependencies = BTreeMap::new();
    merge_dependencies(&mut dependencies, &input.component_dependencies);
    merge_dependencies(&mut dependencies, &input.demo_dependencies);
    merge_dependencies(&mut dependencies, &input.registry_dependencies);
    for package in ["react", "react-dom"] {
        dependencies
            .entry(package.to_string())
            .or_insert_with(|| DEFAULT_REACT_VERSION.to_string());
    }

    debug!(
        files = files.len(),
        dependencies = dependencies.len(),
        "Assembled preview bundle"
    );

    Ok(PreviewBundle {
        files,
        dependencies,
        external_resources: input.stylesheets.clone(),
        entry: ENTRY_PATH.to_string(),
    })
}

fn demo_entry(demo_code: &str) -> Result<DemoEntry, BundleError> {
    let summary = scan(demo_code);
    let named = summary.value_export_names();
    if !named.is_empty() {
        return Ok(DemoEntry::Named(named));
    }
    if summary.has_default_export() {
        return Ok(DemoEntry::Default);
    }
    Err(BundleError::NoRenderableExport)
}

fn render_entry(entry: &DemoEntry) -> String {
    let (import, elements) = match entry {
        DemoEntry::Named(names) => (
            format!("import {{ {} }} from './Demo';", names.join(", ")),
            names
                .iter()
                .map(|name| format!("      <{} />", name))
                .collect::<Vec<_>>(),
        ),
        DemoEntry::Default => (
            "import Demo from './Demo';".to_string(),
            vec!["      <Demo />".to_string()],
        ),
    };

    format!(
        "import React from 'react';
{import}

export default function App() {{
  return (
    <div className=\"flex min-h-screen w-full items-center justify-center p-4\">
{elements}
    </div>
  );
}}
",
        import = import,
        elements = elements.join("\n"),
    )
}

fn render_demo(demo_code: &str, component_names: &[String]) -> String {
    let cleaned = remove_component_imports(demo_code, component_names).modified_code;
    if component_names.is_empty() {
        return cleaned;
    }
    format!(
        "import {{ {} }} from \"{}\";\n{}",
        component_names.join(", "),
        COMPONENT_MODULE,
        cleaned
    )
}

fn tsconfig() -> String {
    let config = json!({
        "compilerOptions": {
            "jsx": "react-jsx",
            "esModuleInterop": true,
            "baseUrl": ".",
            "paths": { "@/*": ["./*"] }
        }
    });
    serde_json::to_string_pretty(&config).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(name, version)| (name.to_string(), version.to_string()))
            .collect()
    }

    fn input() -> PreviewInput {
        PreviewInput {
            code: "import { cn } from \"@/lib/utils\";\nexport function Button() {}\nexport const buttonVariants = {};\n".to_string(),
            demo_code: "import { Button } from \"@/components/ui/button\";\nexport function ButtonDemo() { return <Button /> }\n".to_string(),
            registry_files: [(
                "/components/ui/icon.tsx".to_string(),
                "export function Icon() {}".to_string(),
            )]
            .into_iter()
            .collect(),
            component_dependencies: deps(&[("clsx", "^2.1.1")]),
            demo_dependencies: deps(&[("clsx", "^1.0.0")]),
            registry_dependencies: deps(&[("react", "^19.0.0")]),
            stylesheets: vec!["https://cdn.test/tailwind.css".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_assemble_files() {
        let bundle = assemble(&input()).unwrap();

        assert_eq!(
            bundle.files.keys().collect::<Vec<_>>(),
            vec![
                "/App.tsx",
                "/Component.tsx",
                "/Demo.tsx",
                "/components/ui/icon.tsx",
                "/lib/utils.ts",
                "/tsconfig.json",
            ]
        );
        assert_eq!(bundle.entry, "/App.tsx");
        assert_eq!(bundle.external_resources, vec!["https://cdn.test/tailwind.css"]);

        let app = &bundle.files["/App.tsx"];
        assert!(app.contains("import { ButtonDemo } from './Demo';"));
        assert!(app.contains("<ButtonDemo />"));

        assert_eq!(
            bundle.files["/Demo.tsx"],
            "import { Button, buttonVariants } from \"./Component\";\nexport function ButtonDemo() { return <Button /> }\n"
        );

        let tsconfig: serde_json::Value =
            serde_json::from_str(&bundle.files["/tsconfig.json"]).unwrap();
        assert_eq!(tsconfig["compilerOptions"]["paths"]["@/*"][0], "./*");
        assert_eq!(tsconfig["compilerOptions"]["jsx"], "react-jsx");
    }

    #[test]
    fn test_aliased_component_import() {
        let mut input = input();
        input.demo_code = "import { Button as B } from \"@/components/ui/button\";\nexport function ButtonDemo() { return <B /> }\n".to_string();

        let bundle = assemble(&input).unwrap();
        assert_eq!(
            bundle.files["/Demo.tsx"],
            "import { Button, buttonVariants } from \"./Component\";\nimport { Button as B } from \"./Component\";\nexport function ButtonDemo() { return <B /> }\n"
        );
    }

    #[test]
    fn test_dependency_precedence() {
        let bundle = assemble(&input()).unwrap();
        assert_eq!(bundle.dependencies["clsx"], "^2.1.1");
        assert_eq!(bundle.dependencies["react"], "^19.0.0");
        assert_eq!(bundle.dependencies["react-dom"], DEFAULT_REACT_VERSION);
    }

    #[test]
    fn test_default_export_fallback() {
        let mut input = input();
        input.demo_code = "export default function () { return null }".to_string();
        let bundle = assemble(&input).unwrap();
        let app = &bundle.files["/App.tsx"];
        assert!(app.contains("import Demo from './Demo';"));
        assert!(app.contains("<Demo />"));
    }

    #[test]
    fn test_unrenderable_demo() {
        let mut input = input();
        input.demo_code = "const x = 1;".to_string();
        assert_eq!(assemble(&input), Err(BundleError::NoRenderableExport));
    }

    #[test]
    fn test_optional_style_files() {
        let mut input = input();
        input.global_css = Some(":root { --radius: 0.5rem; }".to_string());
        input.compiled_css = Some(".btn{}".to_string());
        let bundle = assemble(&input).unwrap();
        assert!(bundle.files.contains_key("/globals.css"));
        assert!(bundle.files.contains_key("/compiled.css"));
        assert!(!bundle.files.contains_key("/tailwind.config.js"));
    }
}
