//! Command dispatch

use std::any::Any;
use std::borrow::Cow;
use std::cell::RefCell;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use clap::CommandFactory;
use clap_complete::generate;
use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::{Blueprint, BuiltTree, SystemSpec};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{Delivery, LinkMode, Named, Routing, System, TreeNodeConvert};

/// One node reached by a broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Visit {
    pub name: String,
    pub depth: usize,
    pub kind: String,
    pub lparam: Option<String>,
    pub rparam: Option<String>,
}

pub type VisitLog = Rc<RefCell<Vec<Visit>>>;

/// Node that writes every delivery it sees into a shared log.
pub struct Recorder {
    name: String,
    visits: VisitLog,
}

impl Recorder {
    pub fn new(name: impl Into<String>, visits: VisitLog) -> Self {
        Self {
            name: name.into(),
            visits,
        }
    }
}

impl System<String> for Recorder {
    fn on_message(&mut self, delivery: &Delivery<'_, String>) -> Routing {
        self.visits.borrow_mut().push(Visit {
            name: self.name.clone(),
            depth: delivery.depth,
            kind: delivery.kind.clone(),
            lparam: delivery.lparam::<String>().cloned(),
            rparam: delivery.rparam::<String>().cloned(),
        });
        Routing::Forward
    }

    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.name)
    }
}

/// Message to broadcast through a recorded tree.
#[derive(Debug, Clone, Default)]
pub struct PostRequest {
    pub from: String,
    pub kind: String,
    pub lparam: Option<String>,
    pub rparam: Option<String>,
    pub filter: bool,
    pub source: Option<String>,
    /// Systems removed from their parent before posting
    pub detach: Vec<String>,
    /// `(child, parent)` links added before posting, after `detach`
    pub reparent: Vec<(String, String)>,
}

/// Build `blueprint` with recording nodes, apply the request's link edits,
/// post it and return the visits in delivery order.
#[instrument(level = "debug", skip(blueprint))]
pub fn record_post(
    blueprint: &Blueprint,
    mode: LinkMode,
    request: &PostRequest,
) -> CliResult<Vec<Visit>> {
    let visits = VisitLog::default();
    let mut built: BuiltTree<String> = blueprint.build(mode, |spec: &SystemSpec| {
        Box::new(Recorder::new(spec.name.clone(), visits.clone())) as Box<dyn System<String>>
    })?;
    apply_link_edits(&mut built, request)?;

    let from = built.id(&request.from)?;
    let lparam = request.lparam.as_ref().map(|p| p as &dyn Any);
    let rparam = request.rparam.as_ref().map(|p| p as &dyn Any);
    match &request.source {
        Some(source) => {
            let source = built.id(source)?;
            built
                .tree
                .post_message_from(from, Some(source), request.kind.clone(), lparam, rparam);
        }
        None => built
            .tree
            .post_message(from, request.kind.clone(), lparam, rparam, request.filter),
    }

    let recorded = visits.borrow().clone();
    Ok(recorded)
}

/// Detach, then reparent, through the tree's own link mode.
fn apply_link_edits(built: &mut BuiltTree<String>, request: &PostRequest) -> CliResult<()> {
    for name in &request.detach {
        let child = built.id(name)?;
        match built.tree.parent(child) {
            Some(parent) => built.tree.remove_child(parent, child),
            None => debug!(system = %name, "already a root"),
        }
    }
    for (child_name, parent_name) in &request.reparent {
        let child = built.id(child_name)?;
        let parent = built.id(parent_name)?;
        if child == parent || built.tree.is_ancestor(child, parent) {
            return Err(CliError::InvalidArgs(format!(
                "cannot add {} under {}: it would create a cycle",
                child_name, parent_name
            )));
        }
        built.tree.add_child(parent, child);
    }
    Ok(())
}

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Tree) => _tree(cli),
        Some(Commands::Post {
            from,
            kind,
            lparam,
            rparam,
            filter,
            no_filter,
            source,
            detach,
            reparent,
        }) => {
            let settings = load_settings(cli)?;
            let request = PostRequest {
                from: from.clone(),
                kind: kind.clone().unwrap_or_else(|| settings.default_kind.clone()),
                lparam: lparam.clone(),
                rparam: rparam.clone(),
                filter: *filter || (settings.filter_sender && !*no_filter),
                source: source.clone(),
                detach: detach.clone(),
                reparent: reparent.clone(),
            };
            _post(cli, &settings, &request)
        }
        Some(Commands::Child { name, index }) => _child(cli, name, *index),
        Some(Commands::Config { command }) => _config(cli, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Ok(()),
    }
}

/// Directory holding the local settings file: the blueprint's, else cwd.
fn blueprint_dir(cli: &Cli) -> &Path {
    cli.blueprint
        .as_deref()
        .and_then(Path::parent)
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
}

fn load_settings(cli: &Cli) -> CliResult<Settings> {
    let mut settings = Settings::load(Some(blueprint_dir(cli)))?;
    if let Some(mode) = cli.mode {
        settings.link_mode = mode.into();
    }
    debug!(?settings, "effective settings");
    Ok(settings)
}

fn blueprint_path(cli: &Cli, settings: &Settings) -> CliResult<PathBuf> {
    cli.blueprint
        .clone()
        .or_else(|| settings.blueprint.clone())
        .ok_or_else(|| CliError::Usage("no blueprint given (use --blueprint or settings)".into()))
}

fn load_blueprint(cli: &Cli, settings: &Settings) -> CliResult<Blueprint> {
    let path = blueprint_path(cli, settings)?;
    Ok(Blueprint::load(&path)?)
}

fn build_named(blueprint: &Blueprint, mode: LinkMode) -> CliResult<BuiltTree<String>> {
    Ok(blueprint.build(mode, |spec: &SystemSpec| {
        Box::new(Named(spec.name.clone())) as Box<dyn System<String>>
    })?)
}

#[instrument(skip(cli))]
fn _tree(cli: &Cli) -> CliResult<()> {
    let settings = load_settings(cli)?;
    let blueprint = load_blueprint(cli, &settings)?;
    let built = build_named(&blueprint, settings.link_mode)?;

    for root in built.roots() {
        output::info(&built.tree.to_tree_string(root));
    }
    Ok(())
}

#[instrument(skip(cli, settings))]
fn _post(cli: &Cli, settings: &Settings, request: &PostRequest) -> CliResult<()> {
    if request.kind.trim().is_empty() {
        return Err(CliError::InvalidArgs("message kind must not be empty".into()));
    }
    let blueprint = load_blueprint(cli, settings)?;
    let visits = record_post(&blueprint, settings.link_mode, request)?;

    output::header(&format!("{} from {}", request.kind, request.from));
    for visit in &visits {
        let payloads = [visit.lparam.as_deref(), visit.rparam.as_deref()]
            .into_iter()
            .flatten()
            .join(", ");
        output::visit(visit.depth, &visit.name, &payloads);
    }
    if visits.is_empty() {
        output::warning("no system received the message");
    }
    Ok(())
}

#[instrument(skip(cli))]
fn _child(cli: &Cli, name: &str, index: usize) -> CliResult<()> {
    let settings = load_settings(cli)?;
    let blueprint = load_blueprint(cli, &settings)?;
    let built = build_named(&blueprint, settings.link_mode)?;

    let parent = built.id(name)?;
    match built.tree.child(parent, index).and_then(|id| built.name(id)) {
        Some(child) => output::info(child),
        None => output::warning(&format!(
            "{} has no child at index {} ({} children)",
            name,
            index,
            built.tree.child_count(parent)
        )),
    }
    Ok(())
}

fn _config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli)?;
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("global", &path.display()),
                None => output::warning("no global config directory on this platform"),
            }
            output::action("local", &local_config_path(blueprint_dir(cli)).display());
        }
    }
    Ok(())
}
