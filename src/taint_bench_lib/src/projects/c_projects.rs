//! Real-world C projects.

use crate::project::binary::{wrap_paths_to_binaries, Binaries, BinaryType};
use crate::project::recipe::{BuildCommand, ConfigureArgs};
use crate::project::revisions::{BlockedRevisions, RevisionSpan};
use crate::project::source::Source;
use crate::project::{ProjectDescriptor, ProjectGroup};

/// The binaries of the GNU coreutils, relative to the source directory.
///
/// Left out: `src/[` (not a valid file name component), `dcgen` and `libstdbuf.so`
/// (missing in older revisions), `stdbuf` and `du-tests` (scripts) and `blake2` (a directory).
const COREUTILS_BINARIES: &[&str] = &[
    "src/uniq",
    "src/dircolors",
    "src/numfmt",
    "src/b2sum",
    "src/mv",
    "src/fold",
    "src/dir",
    "src/mkfifo",
    "src/vdir",
    "src/sha512sum",
    "src/unexpand",
    "src/join",
    "src/nproc",
    "src/ptx",
    "src/printf",
    "src/ginstall",
    "src/du",
    "src/printenv",
    "src/groups",
    "src/sync",
    "src/ln",
    "src/shuf",
    "src/false",
    "src/mkdir",
    "src/chmod",
    "src/link",
    "src/cat",
    "src/pwd",
    "src/chown",
    "src/head",
    "src/sleep",
    "src/fmt",
    "src/getlimits",
    "src/test",
    "src/paste",
    "src/comm",
    "src/mknod",
    "src/kill",
    "src/sha384sum",
    "src/sort",
    "src/sum",
    "src/sha224sum",
    "src/expand",
    "src/basenc",
    "src/truncate",
    "src/dd",
    "src/tail",
    "src/df",
    "src/tee",
    "src/tsort",
    "src/yes",
    "src/sha1sum",
    "src/rm",
    "src/make-prime-list",
    "src/logname",
    "src/pathchk",
    "src/whoami",
    "src/wc",
    "src/basename",
    "src/nohup",
    "src/chroot",
    "src/users",
    "src/csplit",
    "src/hostid",
    "src/readlink",
    "src/timeout",
    "src/base64",
    "src/id",
    "src/nl",
    "src/stat",
    "src/cp",
    "src/shred",
    "src/who",
    "src/tr",
    "src/echo",
    "src/date",
    "src/split",
    "src/seq",
    "src/md5sum",
    "src/env",
    "src/expr",
    "src/true",
    "src/chcon",
    "src/chgrp",
    "src/mktemp",
    "src/unlink",
    "src/uname",
    "src/pinky",
    "src/stty",
    "src/rmdir",
    "src/ls",
    "src/runcon",
    "src/nice",
    "src/tty",
    "src/factor",
    "src/tac",
    "src/realpath",
    "src/pr",
    "src/sha256sum",
    "src/cksum",
    "src/touch",
    "src/cut",
    "src/od",
    "src/base32",
    "src/uptime",
    "src/dirname",
];

/// GNU coreutils, the UNIX command-line tools.
pub fn coreutils() -> ProjectDescriptor {
    let binaries: Vec<(&str, BinaryType)> = COREUTILS_BINARIES
        .iter()
        .map(|path| (*path, BinaryType::Executable))
        .collect();
    ProjectDescriptor {
        name: "coreutils",
        group: ProjectGroup::CProjects,
        domain: "utils",
        sources: vec![Source::git(
            "https://github.com/coreutils/coreutils.git",
            "coreutils",
        )],
        blocked: Vec::new(),
        binaries: Binaries::Static(wrap_paths_to_binaries(&binaries)),
        configure: vec![
            BuildCommand::GitSubmoduleUpdate,
            BuildCommand::Run {
                program: "./bootstrap",
                args: Vec::new(),
            },
            BuildCommand::configure(&["--disable-gcc-warnings"]),
        ],
        build: vec![BuildCommand::make()],
        tests: vec![BuildCommand::Make {
            dir: ".",
            targets: vec!["check"],
        }],
        cflags: Vec::new(),
        cve_products: vec![("gnu", "coreutils")],
    }
}

/// The TLS framework OpenSSL.
pub fn openssl() -> ProjectDescriptor {
    ProjectDescriptor {
        name: "openssl",
        group: ProjectGroup::CProjects,
        domain: "security",
        sources: vec![Source::git(
            "https://github.com/openssl/openssl.git",
            "openssl",
        )],
        blocked: Vec::new(),
        binaries: Binaries::Static(wrap_paths_to_binaries(&[(
            "libssl.so",
            BinaryType::SharedLibrary,
        )])),
        configure: vec![BuildCommand::Configure {
            script: "./config",
            args: ConfigureArgs::Fixed(Vec::new()),
        }],
        build: vec![BuildCommand::make()],
        tests: Vec::new(),
        cflags: Vec::new(),
        cve_products: vec![("openssl_project", "openssl"), ("openssl", "openssl")],
    }
}

/// The compression tool xz.
pub fn xz() -> ProjectDescriptor {
    ProjectDescriptor {
        name: "xz",
        group: ProjectGroup::CProjects,
        domain: "compression",
        sources: vec![Source::git("https://github.com/xz-mirror/xz.git", "xz")],
        blocked: vec![
            BlockedRevisions::good_bad_subgraph(
                &["cf49f42a6bd40143f54a6b10d6e605599e958c0b"],
                &["4c7ad179c78f97f68ad548cb40a9dfa6871655ae"],
                "missing file api/lzma/easy.h",
            ),
            BlockedRevisions::good_bad_subgraph(
                &["335fe260a81f61ec99ff5940df733b4c50aedb7c"],
                &["24e0406c0fb7494d2037dec033686faf1bf67068"],
                "use of undeclared LZMA_THREADS_MAX",
            ),
            BlockedRevisions::revision_range(
                "5d018dc03549c1ee4958364712fb0c94e1bf2741",
                "c324325f9f13cdeb92153c5d00962341ba070ca2",
                "Initial git import without xz",
            ),
        ],
        // Older revisions do not build the binary with libtool.
        binaries: Binaries::ByRevision {
            span: RevisionSpan::new(
                "5cda29b5665004fc0f21d0c41d78022a6a559ab2",
                "b2172cf823d3be34cb0246cb4cb32d105e2a34c9",
            ),
            inside: wrap_paths_to_binaries(&[("src/xz/xz", BinaryType::Executable)]),
            outside: wrap_paths_to_binaries(&[("src/xz/.libs/xz", BinaryType::Executable)]),
        },
        configure: vec![
            BuildCommand::Autoreconf {
                args: vec!["--install"],
            },
            // Dynamic linking is off by default until f9907503f882a745dce9d84c2968f6c175ba966a.
            BuildCommand::Configure {
                script: "./configure",
                args: ConfigureArgs::ByRevision {
                    span: RevisionSpan::new(
                        "5d018dc03549c1ee4958364712fb0c94e1bf2741",
                        "fda4724d8114fccfa31c1839c15479f350c2fb4c",
                    ),
                    inside: vec!["--enable-dynamic=yes"],
                    outside: Vec::new(),
                },
            },
        ],
        build: vec![BuildCommand::make()],
        tests: Vec::new(),
        cflags: vec!["-fPIC"],
        cve_products: vec![("tukaani", "xz")],
    }
}
