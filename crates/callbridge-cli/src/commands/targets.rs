//! `callbridge targets`: List supported target ABIs.

use callbridge_abi::TargetAbi;
use termcolor::ColorChoice;

use crate::output::StyledOutput;

pub fn execute(color: ColorChoice) -> anyhow::Result<()> {
    let host = TargetAbi::host();
    let mut out = StyledOutput::new(color);
    for target in TargetAbi::all() {
        out.bold(&format!("{:<14}", target.name()));
        out.plain(&format!(
            "register threshold {:>2} bytes, HFA members {}",
            target.register_pass_threshold(),
            target.max_hfa_members()
        ));
        if target == host {
            out.info("  (host)");
        }
        out.newline();
    }
    out.flush();
    Ok(())
}
