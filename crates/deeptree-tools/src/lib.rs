//! DeepTree Tools - named capabilities that tasks dispatch to
//!
//! Tools (src/tools/) are single-purpose handlers invoked by `ToolCall` tasks.
//! Plugins (src/plugins/) are multi-operation handlers invoked by `Plugin`
//! tasks and select their operation from `parameters["type"]`.
//! To add one: create the file, implement the trait, register it below.

pub mod plugins;
pub mod registry;
pub mod text;
pub mod tools;

pub use registry::{
    CapabilityInfo, Plugin, PluginRegistry, Registry, Registrable, Tool, ToolContext,
    ToolRegistry, ToolResult,
};

use deeptree_core::Result;
use std::path::Path;

/// Create the default tool registry with all builtin tools.
///
/// File tools are confined to `workspace_root`.
pub fn create_default_tools(workspace_root: impl AsRef<Path>) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    register_default_tools(&mut registry, workspace_root)?;
    Ok(registry)
}

/// Register the builtin tools into an existing registry.
pub fn register_default_tools(
    registry: &mut ToolRegistry,
    workspace_root: impl AsRef<Path>,
) -> Result<()> {
    let root = workspace_root.as_ref();

    // --- Text tools ---
    registry.add(tools::text_stats::TextStatsTool)?;
    registry.add(tools::text_transform::TextTransformTool)?;

    // --- Read-only file tools ---
    registry.add(tools::read::ReadTool::new(root))?;
    registry.add(tools::glob::GlobTool::new(root))?;

    Ok(())
}

/// Create the default plugin registry with all builtin plugins.
pub fn create_default_plugins() -> Result<PluginRegistry> {
    let mut registry = PluginRegistry::new();
    register_default_plugins(&mut registry)?;
    Ok(registry)
}

pub fn register_default_plugins(registry: &mut PluginRegistry) -> Result<()> {
    registry.add(plugins::data_analysis::DataAnalysisPlugin)?;
    registry.add(plugins::text_processing::TextProcessingPlugin)?;
    Ok(())
}
