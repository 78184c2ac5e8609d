//! `chorus instance` — register Greenplum/Hadoop instances.

use std::io::Write as _;
use std::path::Path;

use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;

use chorus_core::event::{EmitRequest, EventKind, TargetRole, emit};
use chorus_core::model::{EntityRef, EntityType, InstanceFlavor};
use chorus_core::store::entity;

use crate::cmd::{open_project, resolve_identity};
use crate::output::{OutputMode, render};

#[derive(Args, Debug)]
pub struct InstanceArgs {
    #[command(subcommand)]
    pub command: InstanceCommand,
}

#[derive(Subcommand, Debug)]
pub enum InstanceCommand {
    #[command(about = "Register a data instance")]
    Add(InstanceAddArgs),
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FlavorArg {
    Greenplum,
    Hadoop,
}

impl From<FlavorArg> for InstanceFlavor {
    fn from(value: FlavorArg) -> Self {
        match value {
            FlavorArg::Greenplum => Self::Greenplum,
            FlavorArg::Hadoop => Self::Hadoop,
        }
    }
}

#[derive(Args, Debug)]
pub struct InstanceAddArgs {
    /// Display name for the instance.
    pub name: String,

    /// Backend flavor.
    #[arg(long, value_enum)]
    pub flavor: FlavorArg,

    /// Optional free-text description.
    #[arg(long)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
struct InstanceAddOutput {
    ok: bool,
    instance_id: i64,
    name: String,
    flavor: String,
    event_id: i64,
}

pub fn run_instance(
    args: &InstanceArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    match &args.command {
        InstanceCommand::Add(add) => run_instance_add(add, user_flag, output, project_root),
    }
}

fn run_instance_add(
    args: &InstanceAddArgs,
    user_flag: Option<&str>,
    output: OutputMode,
    project_root: &Path,
) -> anyhow::Result<()> {
    let mut project = open_project(project_root, output)?;
    let actor = resolve_identity(&project.conn, user_flag, output)?;

    let flavor: InstanceFlavor = args.flavor.into();
    let instance_id = entity::create_instance(
        &project.conn,
        &args.name,
        flavor,
        args.description.as_deref(),
    )?;

    let kind = match flavor {
        InstanceFlavor::Greenplum => EventKind::GreenplumInstanceCreated,
        InstanceFlavor::Hadoop => EventKind::HadoopInstanceCreated,
    };
    let event = emit(
        &mut project.conn,
        &EmitRequest::new(kind, actor.id).target(
            TargetRole::Target1,
            EntityRef::new(EntityType::Instance, instance_id),
        ),
    )?;

    let result = InstanceAddOutput {
        ok: true,
        instance_id,
        name: args.name.clone(),
        flavor: flavor.as_str().to_string(),
        event_id: event.id,
    };

    render(output, &result, |r, w| {
        writeln!(w, "✓ {} instance {} registered", r.flavor, r.name)
    })
}
