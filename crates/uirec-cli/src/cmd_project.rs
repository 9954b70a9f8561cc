use clap::Subcommand;
use std::path::Path;

use uirec_core::ids::ProjectRef;
use uirec_ledger::Ledger;

#[derive(Subcommand)]
pub enum ProjectCmd {
    /// Register a project
    Add {
        /// Project id (owner+name)
        project: String,
    },
    /// Give a user read access to a project
    Grant {
        /// Project id (owner+name)
        project: String,
        /// User id, as sent in `x-uirec-user`
        user: String,
    },
    /// List registered projects
    List,
}

pub fn run(cmd: ProjectCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        ProjectCmd::Add { project } => add(repo_root, &project),
        ProjectCmd::Grant { project, user } => grant(repo_root, &project, &user),
        ProjectCmd::List => list(repo_root),
    }
}

pub fn add(repo_root: &Path, project: &str) -> anyhow::Result<()> {
    let project = ProjectRef::parse(project)?;
    let store = Ledger::open(repo_root)?.store()?;
    let id = store.create_project(&project.owner, &project.name)?;
    println!("Project {id} registered");
    Ok(())
}

pub fn grant(repo_root: &Path, project: &str, user: &str) -> anyhow::Result<()> {
    let store = Ledger::open(repo_root)?.store()?;
    if !store.project_exists(project)? {
        anyhow::bail!("unknown project '{project}'");
    }
    store.add_member(project, user)?;
    println!("{user} can now read {project}");
    Ok(())
}

pub fn list(repo_root: &Path) -> anyhow::Result<()> {
    let store = Ledger::open(repo_root)?.store()?;
    let projects = store.list_projects()?;
    if projects.is_empty() {
        println!("(no projects)");
    }
    for id in projects {
        println!("{id}\t{} recordings", store.count_recordings(&id)?);
    }
    Ok(())
}
