//! The projects known to the harness.

pub mod c_projects;
pub mod cpp_projects;
pub mod test_projects;

use crate::project::ProjectDescriptor;

/// Get a list of all known projects.
pub fn get_projects() -> Vec<ProjectDescriptor> {
    vec![
        c_projects::coreutils(),
        c_projects::openssl(),
        c_projects::xz(),
        cpp_projects::two_libs_one_project_interaction_discrete_libs_single_project(),
        test_projects::ba_scenarios(),
        test_projects::many_authors(),
        test_projects::szz_base(),
    ]
}

/// Find a project by its name.
pub fn find_project(name: &str) -> Option<ProjectDescriptor> {
    get_projects()
        .into_iter()
        .find(|project| project.name == name)
}
