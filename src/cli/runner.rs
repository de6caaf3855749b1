//! Runner wiring the command line to the login flow

use crate::cli::args::{Args, Command};
use crate::cli::config::LoginConfig;
use crate::error::Result;
use crate::logging::Logger;
use crate::login::{LoginFlow, LoginRequest, TerminalSource, logout};
use crate::registry::HttpTransportFactory;
use crate::registry::scheme::RequestScheme;
use crate::store::{SecureStore, open_store};
use crate::trust::default_install_root;
use std::path::PathBuf;

pub struct Runner {
    args: Args,
    config: LoginConfig,
    output: Logger,
}

impl Runner {
    pub fn new(args: Args) -> Result<Self> {
        let config = LoginConfig::resolve(&args)?;

        // Create output manager based on config
        let output = if config.quiet {
            Logger::new_quiet()
        } else {
            Logger::new(config.verbose)
        };

        Ok(Self {
            args,
            config,
            output,
        })
    }

    pub fn output(&self) -> &Logger {
        &self.output
    }

    pub async fn run(&self) -> Result<()> {
        let store = open_store(
            self.config.store,
            &self.config.keychain_id,
            &self.config.credentials_file,
        );

        match &self.args.command {
            Command::Login {
                server,
                username,
                password_stdin,
                scheme,
            } => {
                self.login(store.as_ref(), server, username.clone(), *password_stdin, *scheme)
                    .await?
            }
            Command::Logout { server } => self.logout(store.as_ref(), server).await?,
        }

        if let Some(elapsed) = self.output.elapsed() {
            self.output
                .verbose(&format!("Completed in {}", self.output.format_duration(elapsed)));
        }
        Ok(())
    }

    async fn login(
        &self,
        store: &dyn SecureStore,
        server: &str,
        username: Option<String>,
        password_stdin: bool,
        scheme: RequestScheme,
    ) -> Result<()> {
        let request = LoginRequest {
            server: server.to_string(),
            username,
            password_stdin,
            scheme,
        };

        let install_root = self.install_root()?;
        self.output
            .detail(&format!("Install root: {}", install_root.display()));

        let transports =
            HttpTransportFactory::new(self.config.timeout_duration(), self.output.clone());
        let mut flow = LoginFlow::new(&transports, store, install_root)
            .with_retry_policy(self.config.retry_policy())
            .with_output(self.output.clone());
        let mut source = TerminalSource::new(self.output.clone());

        let report = flow.run(&request, &mut source, interrupted()).await?;

        self.output.detail(&format!(
            "Saved credentials for {} as {} ({} trusted caller(s))",
            report.domain,
            report.username,
            report.trusted_paths.len()
        ));
        self.output.success("Login succeeded");
        Ok(())
    }

    async fn logout(&self, store: &dyn SecureStore, server: &str) -> Result<()> {
        let report = logout(server, store, &self.output).await?;
        if report.removed {
            self.output
                .success(&format!("Removing login credentials for {}", report.domain));
        } else {
            self.output
                .info(&format!("Not logged in to {}", report.domain));
        }
        Ok(())
    }

    fn install_root(&self) -> Result<PathBuf> {
        match &self.config.install_root {
            Some(root) => Ok(root.clone()),
            None => default_install_root(),
        }
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
