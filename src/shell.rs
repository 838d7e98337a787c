//! Interactive menu in the terminal.

use anyhow::{anyhow, Result};
use std::io::{self, BufRead, Write};
use std::sync::mpsc;

use crate::catalog::{Catalog, CatalogReader, SchemaDescriptor};
use crate::cloud::{CloudClient, CloudSession, Credentials, UploadProgress};
use crate::config::{Config, LibraryConfig};
use crate::locator::{default_calibre_config, locate_library, LibraryLocation};
use crate::sync::{run_sync, sync_one, SyncPlan};

const WELCOME: &str = "welcome to the calibrolino menu";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ChangeCredentials,
    Connect,
    UploadAll,
    UploadOne,
    Quit,
}

impl Command {
    pub const ALL: [Command; 5] = [
        Command::ChangeCredentials,
        Command::Connect,
        Command::UploadAll,
        Command::UploadOne,
        Command::Quit,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Command::ChangeCredentials => "1",
            Command::Connect => "2",
            Command::UploadAll => "3",
            Command::UploadOne => "4",
            Command::Quit => "q",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Command::ChangeCredentials => "change credentials",
            Command::Connect => "connect",
            Command::UploadAll => "upload all the calibre library",
            Command::UploadOne => "upload only one book",
            Command::Quit => "quit",
        }
    }

    pub fn parse(input: &str) -> Option<Self> {
        match input.trim() {
            "1" => Some(Command::ChangeCredentials),
            "2" => Some(Command::Connect),
            "3" => Some(Command::UploadAll),
            "4" => Some(Command::UploadOne),
            "q" | "Q" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Read the calibre library described by `config`.
pub fn read_catalog(config: &LibraryConfig) -> Result<Catalog> {
    let location = match &config.library_path {
        Some(root) => LibraryLocation::from_root(root)?,
        None => {
            let calibre_config = config
                .calibre_config
                .clone()
                .unwrap_or_else(default_calibre_config);
            locate_library(&calibre_config)?
        }
    };
    let reader = CatalogReader::open(&location, SchemaDescriptor::calibre())?;
    Ok(reader.read(&config.accepted_formats, &config.status_column)?)
}

pub struct Shell<C, R, W>
where
    C: CloudClient + Send,
    R: BufRead,
    W: Write,
{
    config: Config,
    new_client: fn(&Credentials) -> C,
    input: R,
    output: W,
    running: bool,
}

impl<C, R, W> Shell<C, R, W>
where
    C: CloudClient + Send,
    R: BufRead,
    W: Write,
{
    pub fn new(config: Config, new_client: fn(&Credentials) -> C, input: R, output: W) -> Self {
        Self {
            config,
            new_client,
            input,
            output,
            running: true,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        writeln!(self.output, "{}", WELCOME)?;
        while self.running {
            self.print_menu()?;
            let Some(choice) = self.prompt("please select:")? else {
                break;
            };
            match Command::parse(&choice) {
                Some(command) => self.dispatch(command)?,
                None => writeln!(self.output, "please select a valid option")?,
            }
            writeln!(self.output, "===")?;
        }
        Ok(())
    }

    pub fn dispatch(&mut self, command: Command) -> Result<()> {
        tracing::debug!(?command, "Menu command");
        match command {
            Command::ChangeCredentials => self.change_credentials(),
            Command::Connect => self.connect(),
            Command::UploadAll => self.upload_all(),
            Command::UploadOne => self.upload_one(),
            Command::Quit => {
                writeln!(self.output, "goodbye")?;
                self.running = false;
                Ok(())
            }
        }
    }

    fn print_menu(&mut self) -> io::Result<()> {
        for command in Command::ALL {
            writeln!(self.output, "{} {}", command.key(), command.label())?;
        }
        Ok(())
    }

    /// Print `message` and read one line. `None` on end of input.
    fn prompt(&mut self, message: &str) -> io::Result<Option<String>> {
        writeln!(self.output, "{}", message)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn change_credentials(&mut self) -> Result<()> {
        writeln!(self.output, "enter the new credentials")?;
        let (Some(server_name), Some(username), Some(password)) = (
            self.prompt("server:")?,
            self.prompt("username:")?,
            self.prompt("password:")?,
        ) else {
            return Ok(());
        };

        self.config.set_credentials(Credentials {
            server_name,
            username,
            password,
        });
        self.config.save()?;
        writeln!(self.output, "credentials saved")?;
        Ok(())
    }

    fn connect(&mut self) -> Result<()> {
        let Some(catalog) = self.load_catalog()? else {
            return Ok(());
        };
        let Some(mut session) = self.session()? else {
            return Ok(());
        };

        match session.uploaded_books() {
            Ok(uploaded) => {
                let plan = SyncPlan::compute(&catalog.books, &uploaded);
                writeln!(self.output, "{}", plan)?;
            }
            Err(e) => writeln!(self.output, "{}", e)?,
        }
        Ok(())
    }

    fn upload_all(&mut self) -> Result<()> {
        let Some(catalog) = self.load_catalog()? else {
            return Ok(());
        };
        let Some(mut session) = self.session()? else {
            return Ok(());
        };

        let (tx, rx) = mpsc::channel();
        let output = &mut self.output;
        let result = std::thread::scope(|scope| -> Result<_> {
            let worker = scope.spawn(move || run_sync(&mut session, &catalog, Some(&tx)));
            for message in rx {
                print_progress(output, &message)?;
            }
            worker
                .join()
                .map_err(|_| anyhow!("upload worker panicked"))
        })?;

        match result {
            Ok(report) => writeln!(self.output, "{}", report)?,
            Err(e) => writeln!(self.output, "{}", e)?,
        }
        Ok(())
    }

    fn upload_one(&mut self) -> Result<()> {
        let Some(catalog) = self.load_catalog()? else {
            return Ok(());
        };
        let Some(query) = self.prompt("title of the book to upload:")? else {
            return Ok(());
        };
        let Some(book) = catalog.find(&query) else {
            writeln!(self.output, "no book matching {:?}", query)?;
            return Ok(());
        };
        let Some(mut session) = self.session()? else {
            return Ok(());
        };

        writeln!(self.output, "uploading {}", book.title)?;
        match sync_one(&mut session, book) {
            Ok(report) if report.failures.is_empty() => writeln!(self.output, "done")?,
            Ok(report) => {
                for failure in &report.failures {
                    writeln!(self.output, "{}", failure)?;
                }
            }
            Err(e) => writeln!(self.output, "{}", e)?,
        }
        Ok(())
    }

    fn load_catalog(&mut self) -> Result<Option<Catalog>> {
        match read_catalog(&self.config.library) {
            Ok(catalog) => {
                writeln!(self.output, "{} book(s) in the library", catalog.len())?;
                for error in &catalog.errors {
                    writeln!(self.output, "missing file: {}", error)?;
                }
                Ok(Some(catalog))
            }
            Err(e) => {
                tracing::error!(error = %e, "Could not read the library");
                writeln!(self.output, "could not read the library: {:#}", e)?;
                Ok(None)
            }
        }
    }

    fn session(&mut self) -> Result<Option<CloudSession<C>>> {
        match self.config.credentials() {
            Some(credentials) => {
                let client = (self.new_client)(&credentials);
                Ok(Some(CloudSession::new(client, credentials)))
            }
            None => {
                writeln!(self.output, "no credentials stored, please change credentials first")?;
                Ok(None)
            }
        }
    }
}

fn print_progress<W: Write>(output: &mut W, message: &UploadProgress) -> io::Result<()> {
    match message {
        UploadProgress::Started { total } => writeln!(output, "{} book(s) to process", total),
        UploadProgress::Uploading { current, total, title } => {
            writeln!(output, "[{}/{}] uploading {}", current, total, title)
        }
        UploadProgress::Failed { error, .. } => writeln!(output, "failed in upload! {}", error),
        UploadProgress::Completed { .. } => Ok(()),
    }
}
