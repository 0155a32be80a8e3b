use std::io::Write;

use tracing::info;

use livewire_base::{FilePath, LivewireError, LivewireResult, ResultExt};

use super::{CommandContext, CommandOutcome, ConsoleCommand};

/// `livewire:make <name>`: scaffold a component view.
#[derive(Debug, Default, Clone, Copy)]
pub struct MakeCommand;

/// View file for a component name; dots separate directories (`admin.users` ->
/// `<views>/admin/users.html`).
///
/// Segments may contain ASCII letters, digits, `-` and `_`.
pub fn component_view_path(views_directory: &str, name: &str) -> LivewireResult<FilePath> {
    let segments: Vec<&str> = name.split('.').collect();
    let valid = segments.iter().all(|segment| {
        !segment.is_empty()
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    });
    if !valid {
        livewire_base::bail!("Invalid component name '{}'", name);
    }
    Ok(FilePath::from(views_directory).join(format!("{}.html", segments.join("/"))))
}

fn view_stub(name: &str) -> String {
    format!("<div>\n    <!-- {} component -->\n</div>\n", name)
}

impl ConsoleCommand for MakeCommand {
    fn name(&self) -> &'static str {
        "livewire:make"
    }

    fn description(&self) -> &'static str {
        "Create a new Livewire component view"
    }

    fn run(&self, context: &CommandContext, args: &[String]) -> LivewireResult<CommandOutcome> {
        let [name] = args else {
            livewire_base::bail!("livewire:make expects exactly one component name");
        };
        let path = component_view_path(&context.config.components.views_directory, name)?;
        if context.pal.file_exists(&path)? {
            livewire_base::bail!("Component '{}' already exists at {}", name, path);
        }

        if let Some(parent) = path.parent() {
            context.pal.create_directory_all(&parent)?;
        }
        let mut writer = context
            .pal
            .create_file(&path)
            .with_context(|| format!("Failed to create component view {}", path))?;
        writer
            .write_all(view_stub(name).as_bytes())
            .map_err(|e| Box::new(LivewireError::file_error(path.as_path(), e)))?;
        drop(writer);

        info!(component = %name, path = %path, "component created");
        Ok(CommandOutcome::Completed(format!(
            "Component created: {}",
            path
        )))
    }
}
