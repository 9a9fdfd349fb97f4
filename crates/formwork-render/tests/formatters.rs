//! End-to-end rendering through every formatter variant.

use std::fs;

use formwork_render::{
    Encoding, FormatKind, FormworkError, RenderContext, TemplateFormatter, TemplateSyntax,
};

fn context() -> RenderContext {
    let mut ctx = RenderContext::new("0.3.0");
    ctx.assign("name", "Pluto").unwrap();
    ctx.assign("age", 42).unwrap();
    ctx.functions.define("replace_with_a", "|x| 'a'").unwrap();
    ctx
}

fn render(kind: FormatKind, ctx: &RenderContext, template: &str) -> Result<String, FormworkError> {
    let mut formatter = kind.create();
    formatter.init_string(template, &TemplateSyntax::default())?;
    ctx.render(formatter.as_ref())
}

#[test]
fn test_jinja_hello() {
    let out = render(FormatKind::Jinja, &context(), "Hello {{ model.name }}!").unwrap();
    assert_eq!(out, "Hello Pluto!");
}

#[test]
fn test_later_values_override() {
    let mut ctx = context();
    ctx.assign("surname", "Earth").unwrap();
    ctx.assign("surname", "World!").unwrap();
    let out = render(FormatKind::Jinja, &ctx, "Hello {{ model.surname }}!").unwrap();
    assert_eq!(out, "Hello World!!");
}

#[test]
fn test_jinja_loop_over_assigned_list() {
    let mut ctx = context();
    ctx.assign("persons[0].surname", "Mario").unwrap();
    ctx.assign("persons[1].surname", "Paolo").unwrap();
    let template = "Hello {% for p in model.persons %} {{ p.surname }} and {%endfor %}!";
    let out = render(FormatKind::Jinja, &ctx, template).unwrap();
    assert_eq!(out, "Hello  Mario and  Paolo and !");
}

#[test]
fn test_jinja_user_function_both_ways() {
    let mut ctx = context();
    ctx.assign("persons[0].surname", "Mario").unwrap();
    ctx.assign("persons[1].surname", "Paolo").unwrap();
    for call in ["functions.replace_with_a(p.surname)", "replace_with_a(p.surname)"] {
        let template =
            format!("Hello {{% for p in model.persons %}} {{{{ {call} }}}} and {{%endfor %}}!");
        let out = render(FormatKind::Jinja, &ctx, &template).unwrap();
        assert_eq!(out, "Hello  a and  a and !");
    }
}

#[test]
fn test_format_spec_width() {
    let template = "Hello {model.name} {model.age:03}!";
    let out = render(FormatKind::FormatSpec, &context(), template).unwrap();
    assert_eq!(out, "Hello Pluto 042!");
}

#[test]
fn test_format_spec_list_index() {
    let mut ctx = context();
    ctx.assign("persons[0].surname", "Mario").unwrap();
    ctx.assign("persons[1].surname", "Paolo").unwrap();
    let out = render(FormatKind::FormatSpec, &ctx, "Hello {model.persons[1].surname}!").unwrap();
    assert_eq!(out, "Hello Paolo!");
}

#[test]
fn test_interpolation() {
    let ctx = context();
    assert_eq!(
        render(FormatKind::Interpolation, &ctx, "'Hello {model.name}!'").unwrap(),
        "Hello Pluto!"
    );
    assert_eq!(
        render(FormatKind::Interpolation, &ctx, "'Hello {replace_with_a(model.name)}!'").unwrap(),
        "Hello a!"
    );
}

#[test]
fn test_script() {
    let ctx = context();
    assert_eq!(
        render(FormatKind::Script, &ctx, "print(f'Hello {model.name}!')").unwrap(),
        "Hello Pluto!\n"
    );
    assert_eq!(
        render(FormatKind::Script, &ctx, "print(\"Hello\", [1, 2, 3] | join(', '))").unwrap(),
        "Hello 1, 2, 3\n"
    );
}

#[test]
fn test_commons_in_every_variant() {
    let ctx = context();
    let cases = [
        (FormatKind::Jinja, "{{ commons.program_version }}", "0.3.0"),
        (FormatKind::FormatSpec, "{commons.program_version}", "0.3.0"),
        (FormatKind::Interpolation, "'{commons.program_version}'", "0.3.0"),
        (FormatKind::Script, "print(commons.program_version)", "0.3.0\n"),
    ];
    for (kind, template, expected) in cases {
        assert_eq!(render(kind, &ctx, template).unwrap(), expected, "{kind}");
    }
}

#[test]
fn test_undefined_reference_is_render_error_in_every_variant() {
    let ctx = context();
    let cases = [
        (FormatKind::Jinja, "{{ model.nobody.name }}"),
        (FormatKind::FormatSpec, "{model.nobody}"),
        (FormatKind::Interpolation, "'{nobody}'"),
        (FormatKind::Script, "print(nobody)"),
    ];
    for (kind, template) in cases {
        let err = render(kind, &ctx, template).unwrap_err();
        assert!(matches!(err, FormworkError::Render(_)), "{kind}: {err:?}");
    }
}

#[test]
fn test_user_function_behaves_the_same_in_every_calling_variant() {
    let mut ctx = context();
    ctx.functions.define("shout", "|x| (x ~ '!') | upper").unwrap();
    ctx.functions.define("peek", "|x| model.name ~ x").unwrap();
    let cases = [
        (FormatKind::Jinja, "{{ shout(model.name) }}", "{{ peek('?') }}", ""),
        (FormatKind::Interpolation, "'{shout(model.name)}'", "'{peek(\"?\")}'", ""),
        (FormatKind::Script, "print(shout(model.name))", "print(peek('?'))", "\n"),
    ];
    for (kind, call, leak, end) in cases {
        assert_eq!(render(kind, &ctx, call).unwrap(), format!("PLUTO!{end}"), "{kind}");
        let err = render(kind, &ctx, leak).unwrap_err();
        assert!(matches!(err, FormworkError::Render(_)), "{kind}: {err:?}");
    }
}

#[test]
fn test_self_referencing_function_is_render_error() {
    let mut ctx = context();
    ctx.functions.define("f", "|x| f(x)").unwrap();
    let cases = [
        (FormatKind::Jinja, "{{ f(1) }}"),
        (FormatKind::Interpolation, "'{f(1)}'"),
        (FormatKind::Script, "print(f(1))"),
    ];
    for (kind, template) in cases {
        let err = render(kind, &ctx, template).unwrap_err();
        assert!(matches!(err, FormworkError::Render(_)), "{kind}: {err:?}");
    }
}

#[test]
fn test_failed_render_leaves_context_usable() {
    let ctx = context();
    let mut formatter = FormatKind::Jinja.create();
    formatter
        .init_string("{{ model.nobody.name }}", &TemplateSyntax::default())
        .unwrap();
    assert!(ctx.render(formatter.as_ref()).is_err());

    formatter.reset();
    formatter
        .init_string("{{ model.name }}", &TemplateSyntax::default())
        .unwrap();
    assert_eq!(ctx.render(formatter.as_ref()).unwrap(), "Pluto");
}

#[test]
fn test_init_file_trims_and_reports_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello.txt");
    fs::write(&path, "\n\nHello {model.name}!\n\n").unwrap();
    let ctx = context();

    for kind in [FormatKind::FormatSpec, FormatKind::Interpolation] {
        let mut formatter = kind.create();
        formatter
            .init_file(&path, Encoding::Utf8, &TemplateSyntax::default())
            .unwrap();
        assert_eq!(ctx.render(formatter.as_ref()).unwrap(), "Hello Pluto!");
    }

    for kind in FormatKind::ALL {
        let mut formatter = kind.create();
        let err = formatter
            .init_file(&dir.path().join("missing.txt"), Encoding::Utf8, &TemplateSyntax::default())
            .unwrap_err();
        assert!(matches!(err, FormworkError::TemplateNotFound(_)), "{kind}");
    }
}

#[test]
fn test_latin1_template_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("caf.txt");
    fs::write(&path, b"caf\xe9 {{ model.name }}").unwrap();

    let mut formatter = FormatKind::Jinja.create();
    formatter
        .init_file(&path, Encoding::Latin1, &TemplateSyntax::default())
        .unwrap();
    assert_eq!(context().render(formatter.as_ref()).unwrap(), "café Pluto");
}

#[test]
fn test_formatters_are_interchangeable() {
    let ctx = context();
    let templates = [
        (FormatKind::Jinja, "{{ model.age }}"),
        (FormatKind::FormatSpec, "{model.age}"),
        (FormatKind::Interpolation, "'{model.age}'"),
        (FormatKind::Script, "print(model.age, end='')"),
    ];
    let formatters: Vec<(Box<dyn TemplateFormatter>, &str)> = templates
        .iter()
        .map(|(kind, template)| (kind.create(), *template))
        .collect();
    for (mut formatter, template) in formatters {
        formatter
            .init_string(template, &TemplateSyntax::default())
            .unwrap();
        assert_eq!(ctx.render(formatter.as_ref()).unwrap(), "42");
    }
}
