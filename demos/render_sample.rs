use clap::Parser;
use std::path::PathBuf;

use elegant::{
    config::Configuration,
    document::{Document, DocumentOptions},
    error::ContextError,
    surface::TextOptions,
};

#[derive(Parser, Debug)]
#[command(version, long_about = None)]
struct CliArguments {
    /// The document options, as JSON.
    #[arg(short = 'd', long = "document", value_name = "json_file")]
    document_options_path: Option<PathBuf>,
    /// The configuration, as JSON.
    #[arg(short = 'c', long = "configuration", value_name = "json_file")]
    configuration_path: Option<PathBuf>,
    #[arg(short = 'o', long = "output", value_name = "file_path")]
    output_file_path: PathBuf,
    /// How many sections of sample text to write.
    #[arg(short = 's', long = "sections", default_value_t = 3)]
    sections: usize,
}

fn main() {
    if let Err(error) = fallible_main() {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

fn fallible_main() -> Result<(), ContextError> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .init();
    let arguments = CliArguments::parse();
    log::debug!("{:?}", arguments);

    let document_options = match &arguments.document_options_path {
        Some(document_options_path) => DocumentOptions::from_path(document_options_path)?,
        None => DocumentOptions::default(),
    };
    let configuration = match &arguments.configuration_path {
        Some(configuration_path) => Configuration::from_path(configuration_path)?,
        None => Configuration::default(),
    };

    let document = Document::generate(document_options, &configuration, |document| {
        for section in 1..=arguments.sections {
            document.title(&format!("Section {section}"))?;
            document.text(
                &"Lorem ipsum dolor sit amet, consectetur adipiscing elit. ".repeat(30),
                &TextOptions::default(),
            )?;
        }
        Ok(())
    })?;
    log::info!("Rendering {} pages", document.page_count());
    document.render_file(&arguments.output_file_path)?;
    log::info!(
        "Saved the output file to the path: {:?}",
        arguments.output_file_path
    );

    Ok(())
}
