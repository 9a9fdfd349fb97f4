//! End-to-end runs of the command line pipeline against a temporary
//! config file.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Parser;
use formwork::{app, Cli, ConfigError, Outcome, PROGRAM_VERSION};
use tempfile::TempDir;

const CONFIG: &str = r#"
[values]
name = "Pluto"
age = 42

[functions]
replace_with_a = "|x| 'a'"
"#;

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.toml"), CONFIG).unwrap();
        Self { dir }
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> anyhow::Result<(Outcome, String)> {
        let config = self.path("config.toml");
        let argv = ["formwork", "--config-file", config.to_str().unwrap()]
            .into_iter()
            .chain(args.iter().copied());
        let cli = Cli::try_parse_from(argv)?;
        let mut out = Vec::new();
        let outcome = app::run(&cli, &mut out)?;
        Ok((outcome, String::from_utf8(out)?))
    }

    fn stdout(&self, args: &[&str]) -> String {
        let mut full = vec!["--write-on-stdout"];
        full.extend_from_slice(args);
        self.run(&full).unwrap().1
    }
}

#[test]
fn test_version() {
    let cli = Cli::try_parse_from(["formwork", "--version"]).unwrap();
    let mut out = Vec::new();
    assert_eq!(app::run(&cli, &mut out).unwrap(), Outcome::Version);
    assert_eq!(String::from_utf8(out).unwrap(), format!("{PROGRAM_VERSION}\n"));
}

#[test]
fn test_config_values() {
    let fx = Fixture::new();
    assert_eq!(fx.stdout(&["Hello {{ model.name }}!"]), "Hello Pluto!\n");
}

#[test]
fn test_cli_value_overrides() {
    let fx = Fixture::new();
    assert_eq!(
        fx.stdout(&["--value", "surname", "World!", "Hello {{ model.surname }}!"]),
        "Hello World!!\n"
    );
    assert_eq!(
        fx.stdout(&["--value", "person.surname", "World!", "Hello {{ model.person.surname }}!"]),
        "Hello World!!\n"
    );
    assert_eq!(
        fx.stdout(&["-V", "name", "Mars", "Hello {{ model.name }}!"]),
        "Hello Mars!\n"
    );
}

#[test]
fn test_indexed_values() {
    let fx = Fixture::new();
    let people = ["-V", "persons[0].surname", "Mario", "-V", "persons[1].surname", "Paolo"];

    let mut args = people.to_vec();
    args.push("Hello {% for p in model.persons %} {{ p.surname }} and {%endfor %}!");
    assert_eq!(fx.stdout(&args), "Hello  Mario and  Paolo and !\n");

    let mut args = people.to_vec();
    args.extend(["--format", "format", "Hello {model.persons[1].surname}!"]);
    assert_eq!(fx.stdout(&args), "Hello Paolo!\n");
}

#[test]
fn test_format_variant() {
    let fx = Fixture::new();
    assert_eq!(fx.stdout(&["--format", "format", "Hello {model.name}!"]), "Hello Pluto!\n");
    assert_eq!(
        fx.stdout(&["--format", "format", "Hello {model.name} {model.age}!"]),
        "Hello Pluto 42!\n"
    );
    assert_eq!(
        fx.stdout(&["--format", "format", "Hello {model.name} {model.age:03}!"]),
        "Hello Pluto 042!\n"
    );
}

#[test]
fn test_config_functions() {
    let fx = Fixture::new();
    let people = ["-V", "persons[0].surname", "Mario", "-V", "persons[1].surname", "Paolo"];
    for call in ["functions.replace_with_a(p.surname)", "replace_with_a(p.surname)"] {
        let template =
            format!("Hello {{% for p in model.persons %}} {{{{ {call} }}}} and {{%endfor %}}!");
        let mut args = people.to_vec();
        args.push(&template);
        assert_eq!(fx.stdout(&args), "Hello  a and  a and !\n");
    }
}

#[test]
fn test_interpolation_variant() {
    let fx = Fixture::new();
    assert_eq!(fx.stdout(&["--format", "fstring", "'Hello {model.name}!'"]), "Hello Pluto!\n");
    assert_eq!(
        fx.stdout(&["--format", "fstring", "'Hello {replace_with_a(model.name)}!'"]),
        "Hello a!\n"
    );
}

#[test]
fn test_script_variant() {
    let fx = Fixture::new();
    assert_eq!(
        fx.stdout(&["--format", "python", "print(f'Hello {model.name}!')"]),
        "Hello Pluto!\n\n"
    );
    assert_eq!(
        fx.stdout(&["--format", "python", "print(\"Hello \" ~ [1, 2, 3] | join(', '))"]),
        "Hello 1, 2, 3\n\n"
    );
}

#[test]
fn test_input_file_written_next_to_input() {
    let fx = Fixture::new();
    let input = fx.write("page.txt", "\n{{ model.name }} is {{ model.age }}\n");
    let input_arg = input.to_str().unwrap();

    let (outcome, stdout) = fx.run(&["--input-file", input_arg]).unwrap();
    let expected = fx.path("page.txt.out");
    assert_eq!(outcome, Outcome::Written(expected.clone()));
    assert!(stdout.is_empty());
    assert_eq!(fs::read_to_string(expected).unwrap(), "Pluto is 42");
}

#[test]
fn test_output_file_format_and_encoding() {
    let fx = Fixture::new();
    let input = fx.write("page.txt", "café {{ model.name }}");
    let (outcome, _) = fx
        .run(&[
            "--input-file",
            input.to_str().unwrap(),
            "--output-file",
            "{basedir}/{basename}.rendered",
            "-o",
            "latin-1",
        ])
        .unwrap();
    let expected = fx.path("page.txt.rendered");
    assert_eq!(outcome, Outcome::Written(expected.clone()));
    assert_eq!(fs::read(expected).unwrap(), b"caf\xe9 Pluto");
}

#[test]
fn test_input_file_from_config_is_relative_to_config() {
    let fx = Fixture::new();
    fx.write("templates/hello.j2", "Hello {{ model.name }}!");
    fs::write(
        fx.path("config.toml"),
        format!("[general]\ninput_file = \"templates/hello.j2\"\nwrite_on_stdout = true\n{CONFIG}"),
    )
    .unwrap();
    let (outcome, stdout) = fx.run(&[]).unwrap();
    assert_eq!(outcome, Outcome::Printed);
    assert_eq!(stdout, "Hello Pluto!\n");
}

#[test]
fn test_custom_delimiters() {
    let fx = Fixture::new();
    assert_eq!(
        fx.stdout(&[
            "-e",
            "[[",
            "-E",
            "]]",
            "-b",
            "[%",
            "-B",
            "%]",
            "[% if true %]{{ [[ model.name ]] }}[% endif %]",
        ]),
        "{{ Pluto }}\n"
    );
}

#[test]
fn test_directory_mode() {
    let fx = Fixture::new();
    let source = fx.path("input/foo");
    fx.write("input/foo/greeting.txt.template", "Hi {model.name}");
    fx.write("input/foo/static.txt", "Hi {model.name}");
    fx.write("input/foo/{model.name}.template/readme.md.template", "# {model.name | upper}");
    let destination = fx.path("output/foo");

    let (outcome, _) = fx
        .run(&[
            "--input-directory",
            source.to_str().unwrap(),
            "--output-directory",
            destination.to_str().unwrap(),
            "--template-suffix",
            ".template",
            "--format",
            "fstring",
        ])
        .unwrap();

    match outcome {
        Outcome::Directory(summary) => {
            assert_eq!(summary.rendered, 2);
            assert_eq!(summary.copied, 1);
        }
        other => panic!("expected a directory run, got {other:?}"),
    }
    let read = |p: &str| fs::read_to_string(destination.join(p)).unwrap();
    assert_eq!(read("greeting.txt"), "Hi Pluto");
    assert_eq!(read("static.txt"), "Hi {model.name}");
    assert_eq!(read("Pluto/readme.md"), "# PLUTO");
}

#[test]
fn test_directory_mode_requires_output_directory() {
    let fx = Fixture::new();
    fs::create_dir_all(fx.path("input")).unwrap();
    let err = fx
        .run(&["--input-directory", fx.path("input").to_str().unwrap()])
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::MissingOutputDirectory)
    ));
}

#[test]
fn test_errors_surface() {
    let fx = Fixture::new();
    assert!(fx.run(&["--write-on-stdout", "-V", "a[x]", "1", "{{ 1 }}"]).is_err());
    assert!(fx.run(&["--write-on-stdout", "{{ model.nobody.name }}"]).is_err());
    assert!(fx
        .run(&["--input-file", missing(fx.dir.path()).to_str().unwrap()])
        .is_err());
}

fn missing(dir: &Path) -> PathBuf {
    dir.join("does-not-exist.j2")
}
