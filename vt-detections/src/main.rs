use anyhow::Context;

fn main() -> anyhow::Result<()> {
  let args: Vec<String> = std::env::args().collect();

  match vt_detections::parse_args(&args)? {
    vt_detections::Command::Version => {
      println!("{}", env!("CARGO_PKG_VERSION"));
      Ok(())
    }
    vt_detections::Command::Help => {
      vt_detections::print_help();
      Ok(())
    }
    vt_detections::Command::Run(opts) => {
      vt_core::run(&opts.into_options()).context("vt-detections run")
    }
  }
}
