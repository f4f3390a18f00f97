//! C++ projects.

use crate::project::binary::{wrap_paths_to_binaries, Binaries, BinaryType};
use crate::project::recipe::BuildCommand;
use crate::project::source::Source;
use crate::project::{ProjectDescriptor, ProjectGroup};

/// Interactions between two discrete libraries, included as submodules, and one project using them.
pub fn two_libs_one_project_interaction_discrete_libs_single_project() -> ProjectDescriptor {
    ProjectDescriptor {
        name: "TwoLibsOneProjectInteractionDiscreteLibsSingleProject",
        group: ProjectGroup::CppProjects,
        domain: "library-testproject",
        sources: vec![
            Source::vara_test_repo(
                "LibraryAnalysisRepos/TwoLibsOneProjectInteractionDiscreteLibsSingleProject/Elementalist",
                "TwoLibsOneProjectInteractionDiscreteLibsSingleProject/Elementalist",
            ),
            Source::vara_test_repo_submodule(
                "LibraryAnalysisRepos/TwoLibsOneProjectInteractionDiscreteLibsSingleProject/fire_lib",
                "TwoLibsOneProjectInteractionDiscreteLibsSingleProject/fire_lib",
            ),
            Source::vara_test_repo_submodule(
                "LibraryAnalysisRepos/TwoLibsOneProjectInteractionDiscreteLibsSingleProject/water_lib",
                "TwoLibsOneProjectInteractionDiscreteLibsSingleProject/water_lib",
            ),
        ],
        blocked: Vec::new(),
        binaries: Binaries::Static(wrap_paths_to_binaries(&[(
            "build/test_prog/elementalist/elementalist",
            BinaryType::Executable,
        )])),
        configure: vec![
            BuildCommand::MakeDir { path: "build" },
            BuildCommand::CMake {
                dir: "build",
                args: vec!["-G", "Unix Makefiles", ".."],
            },
        ],
        build: vec![BuildCommand::Make {
            dir: "build",
            targets: Vec::new(),
        }],
        tests: Vec::new(),
        cflags: Vec::new(),
        cve_products: Vec::new(),
    }
}
