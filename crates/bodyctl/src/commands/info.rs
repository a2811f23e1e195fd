use bodyctl_api::models::SystemInfo;
use bodyctl_core::Controller;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

fn detail(info: &SystemInfo) -> String {
    let mut lines = vec![output::detail(&[
        ("Name", info.name.clone()),
        ("Version", info.version.clone()),
        ("Description", info.description.clone()),
    ])];

    if !info.services.is_empty() {
        lines.push(String::new());
        lines.push("Services:".into());
        let width = info.services.keys().map(String::len).max().unwrap_or(0);
        for (name, description) in &info.services {
            let endpoint = info
                .endpoints
                .get(name)
                .map(|e| format!("  [{e}]"))
                .unwrap_or_default();
            lines.push(format!("  {name:<width$}  {description}{endpoint}"));
        }
    }
    lines.join("\n")
}

pub async fn handle(controller: &Controller, global: &GlobalOpts) -> Result<(), CliError> {
    let info = controller.system_info().await?;
    let out = output::render_single(&global.output, &info, detail, |i| {
        format!("{} {}", i.name, i.version)
    })?;
    output::print_output(&out, global.quiet);
    Ok(())
}
