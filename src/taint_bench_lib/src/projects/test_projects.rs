//! Small scenario projects from the VaRA test repositories.

use crate::project::binary::{wrap_paths_to_binaries, Binaries, BinaryType};
use crate::project::recipe::{BuildCommand, Language};
use crate::project::source::Source;
use crate::project::{ProjectDescriptor, ProjectGroup};

/// A scenario consisting of a single `main.c`.
fn single_file_scenario(
    name: &'static str,
    remote: &'static str,
    local: &'static str,
) -> ProjectDescriptor {
    ProjectDescriptor {
        name,
        group: ProjectGroup::TestProjects,
        domain: "testing",
        sources: vec![Source::vara_test_repo(remote, local)],
        blocked: Vec::new(),
        binaries: Binaries::Static(wrap_paths_to_binaries(&[("main", BinaryType::Executable)])),
        configure: Vec::new(),
        build: vec![BuildCommand::CompileSingle {
            language: Language::C,
            sources: vec!["main.c"],
            output: "main",
        }],
        tests: Vec::new(),
        cflags: Vec::new(),
        cve_products: Vec::new(),
    }
}

/// The blame analysis scenarios, which must be placed in the source cache by hand.
pub fn ba_scenarios() -> ProjectDescriptor {
    ProjectDescriptor {
        name: "ba_scenarios",
        group: ProjectGroup::TestProjects,
        domain: "testing",
        sources: vec![Source::local_git("BlameAnalysisScenarios")],
        blocked: Vec::new(),
        binaries: Binaries::Static(wrap_paths_to_binaries(&[(
            "calculator",
            BinaryType::Executable,
        )])),
        configure: vec![BuildCommand::CMake {
            dir: ".",
            args: vec!["-G", "Unix Makefiles", "."],
        }],
        build: vec![BuildCommand::make()],
        tests: Vec::new(),
        cflags: Vec::new(),
        cve_products: Vec::new(),
    }
}

/// Scenario with many authors working on central code.
pub fn many_authors() -> ProjectDescriptor {
    single_file_scenario(
        "many_authors",
        "BlameAnalysisRepos/Scenarios/ManyAuthors",
        "ManyAuthors",
    )
}

/// A scenario with a bug that SZZ should be able to identify,
/// adapted from Kim et al. 2006 "Automatic Identification of Bug-Introducing Changes".
pub fn szz_base() -> ProjectDescriptor {
    single_file_scenario(
        "szz_base",
        "BlameAnalysisRepos/Scenarios/SZZBase",
        "CentralCode",
    )
}
