mod common;

use common::{def, def_with, resolved, runtime, tag_of};
use rb_runtime::{MethodResolution, RuntimeError, Visibility, VisibilityContext};

#[test]
fn mixins_keep_first_listed_first() {
    let (ctx, object) = runtime();
    let a = ctx.define_module(Some("A")).unwrap();
    let b = ctx.define_module(Some("B")).unwrap();
    def(&ctx, a, "hello", "A");
    def(&ctx, b, "hello", "B");

    let c = ctx.define_class(Some("C"), object).unwrap();
    ctx.include_modules(c, &[a, b]).unwrap();
    assert_eq!(ctx.mixins(c).unwrap(), vec![a, b]);
    assert_eq!(resolved(&ctx, c, "hello"), Some("A"));

    ctx.include_modules(c, &[a]).unwrap();
    assert_eq!(ctx.mixins(c).unwrap(), vec![a, b]);

    let d = ctx.define_class(Some("D"), object).unwrap();
    ctx.include_modules(d, &[b, a]).unwrap();
    assert_eq!(resolved(&ctx, d, "hello"), Some("B"));
}

#[test]
fn later_includes_take_priority() {
    let (ctx, object) = runtime();
    let a = ctx.define_module(Some("A")).unwrap();
    let b = ctx.define_module(Some("B")).unwrap();
    def(&ctx, a, "hello", "A");
    def(&ctx, b, "hello", "B");

    let c = ctx.define_class(Some("C"), object).unwrap();
    ctx.include_modules(c, &[a]).unwrap();
    ctx.include_modules(c, &[b]).unwrap();
    assert_eq!(ctx.mixins(c).unwrap(), vec![b, a]);
    assert_eq!(resolved(&ctx, c, "hello"), Some("B"));
}

#[test]
fn resolution_order_walks_mixins_before_superclass() {
    let (ctx, object) = runtime();
    let c = ctx.define_class(Some("C"), object).unwrap();
    let d = ctx.define_class(Some("D"), c).unwrap();
    let m = ctx.define_module(Some("M")).unwrap();
    let n = ctx.define_module(Some("N")).unwrap();
    ctx.include_modules(m, &[n]).unwrap();
    ctx.include_modules(c, &[m]).unwrap();

    assert_eq!(ctx.ancestors(d).unwrap(), vec![d, c, m, n, object]);

    def(&ctx, n, "only_n", "N");
    def(&ctx, m, "both", "M");
    def(&ctx, c, "both", "C");
    assert_eq!(resolved(&ctx, d, "only_n"), Some("N"));
    assert_eq!(resolved(&ctx, d, "both"), Some("C"));
    assert_eq!(ctx.find_method_owner(d, "only_n").unwrap(), Some(n));
    assert!(ctx.has_ancestor(d, n).unwrap());
    assert!(!ctx.is_subclass_of(d, m).unwrap());
    assert!(ctx.is_subclass_of(d, object).unwrap());
}

#[test]
fn include_rejects_classes_and_cycles() {
    let (ctx, object) = runtime();
    let c = ctx.define_class(Some("C"), object).unwrap();
    let other = ctx.define_class(Some("Other"), object).unwrap();
    let m = ctx.define_module(Some("M")).unwrap();
    let n = ctx.define_module(Some("N")).unwrap();

    assert!(matches!(ctx.include_modules(c, &[other]), Err(RuntimeError::NotAModule(_))));
    assert!(matches!(ctx.include_modules(m, &[m]), Err(RuntimeError::CyclicInclude)));
    ctx.include_modules(m, &[n]).unwrap();
    assert!(matches!(ctx.include_modules(n, &[m]), Err(RuntimeError::CyclicInclude)));
}

#[test]
fn undefined_methods_are_distinct_from_missing_ones() {
    let (ctx, object) = runtime();
    let animal = ctx.define_class(Some("Animal"), object).unwrap();
    let dog = ctx.define_class(Some("Dog"), animal).unwrap();
    def(&ctx, animal, "speak", "animal");
    ctx.undefine_method(dog, "speak").unwrap();

    let resolution = ctx.resolve_method(dog, "speak", VisibilityContext::All).unwrap();
    assert!(matches!(resolution, MethodResolution::Undefined { owner } if owner == dog));
    assert!(resolution.is_not_found());
    assert!(matches!(
        ctx.require_method(dog, "speak", VisibilityContext::All),
        Err(RuntimeError::UndefinedMethodCall { .. })
    ));
    assert!(matches!(
        ctx.require_method(dog, "fly", VisibilityContext::All),
        Err(RuntimeError::NotFound { .. })
    ));
    assert_eq!(resolved(&ctx, animal, "speak"), Some("animal"));

    let err = ctx.undefine_method(dog, "fly").unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn removing_a_definition_uncovers_the_inherited_one() {
    let (ctx, object) = runtime();
    let animal = ctx.define_class(Some("Animal"), object).unwrap();
    let dog = ctx.define_class(Some("Dog"), animal).unwrap();
    def(&ctx, animal, "speak", "animal");
    def(&ctx, dog, "speak", "dog");
    assert_eq!(resolved(&ctx, dog, "speak"), Some("dog"));

    assert!(ctx.remove_method(dog, "speak").unwrap());
    assert_eq!(resolved(&ctx, dog, "speak"), Some("animal"));
    assert!(!ctx.remove_method(dog, "speak").unwrap());
}

#[test]
fn hidden_entries_are_skipped() {
    let (ctx, object) = runtime();
    let animal = ctx.define_class(Some("Animal"), object).unwrap();
    let dog = ctx.define_class(Some("Dog"), animal).unwrap();
    def(&ctx, animal, "speak", "animal");
    def(&ctx, dog, "bark", "dog");
    ctx.hide_method(dog, "speak").unwrap();

    assert_eq!(resolved(&ctx, dog, "speak"), Some("animal"));
    let names = ctx.method_names(dog, false).unwrap();
    assert_eq!(names.iter().map(|n| &**n).collect::<Vec<_>>(), vec!["bark"]);
}

#[test]
fn method_names_respect_undefinitions() {
    let (ctx, object) = runtime();
    let animal = ctx.define_class(Some("Animal"), object).unwrap();
    let dog = ctx.define_class(Some("Dog"), animal).unwrap();
    def(&ctx, animal, "speak", "animal");
    def(&ctx, animal, "eat", "animal");
    def(&ctx, dog, "bark", "dog");
    ctx.undefine_method(dog, "eat").unwrap();

    let names = ctx.method_names(dog, true).unwrap();
    assert_eq!(names.iter().map(|n| &**n).collect::<Vec<_>>(), vec!["bark", "speak"]);
}

#[test]
fn private_members_need_an_implicit_receiver() {
    let (ctx, object) = runtime();
    let dog = ctx.define_class(Some("Dog"), object).unwrap();
    def_with(&ctx, object, "secret", "object", Visibility::Private);

    let explicit = VisibilityContext::Explicit { caller: Some(dog) };
    assert!(matches!(
        ctx.resolve_method(dog, "secret", explicit).unwrap(),
        MethodResolution::Inaccessible(_)
    ));
    assert!(ctx.resolve_method(dog, "secret", VisibilityContext::ImplicitSelf).unwrap().is_found());
    match ctx.require_method(dog, "secret", explicit) {
        Err(RuntimeError::Inaccessible { visibility, .. }) => assert_eq!(visibility, Visibility::Private),
        other => panic!("expected an inaccessible error, got {other:?}"),
    }
}

#[test]
fn protected_members_are_visible_to_related_callers() {
    let (ctx, object) = runtime();
    let animal = ctx.define_class(Some("Animal"), object).unwrap();
    let dog = ctx.define_class(Some("Dog"), animal).unwrap();
    let rock = ctx.define_class(Some("Rock"), object).unwrap();
    def_with(&ctx, animal, "rank", "animal", Visibility::Protected);

    let from_dog = VisibilityContext::Explicit { caller: Some(dog) };
    let from_rock = VisibilityContext::Explicit { caller: Some(rock) };
    let from_nowhere = VisibilityContext::Explicit { caller: None };
    assert!(ctx.resolve_method(dog, "rank", from_dog).unwrap().is_found());
    assert!(!ctx.resolve_method(dog, "rank", from_rock).unwrap().is_found());
    assert!(!ctx.resolve_method(dog, "rank", from_nowhere).unwrap().is_found());
}

#[test]
fn visibility_change_on_inherited_method_forwards() {
    let (ctx, object) = runtime();
    let animal = ctx.define_class(Some("Animal"), object).unwrap();
    let dog = ctx.define_class(Some("Dog"), animal).unwrap();
    def(&ctx, animal, "speak", "animal");
    ctx.set_method_visibility(dog, "speak", Visibility::Private).unwrap();

    let explicit = VisibilityContext::Explicit { caller: None };
    assert!(matches!(
        ctx.resolve_method(dog, "speak", explicit).unwrap(),
        MethodResolution::Inaccessible(_)
    ));
    let found = ctx.require_method(dog, "speak", VisibilityContext::ImplicitSelf).unwrap();
    assert_eq!(tag_of(&found), "animal");
    assert_eq!(found.owner(), animal);
    assert!(ctx.resolve_method(animal, "speak", explicit).unwrap().is_found());

    assert!(ctx.set_method_visibility(dog, "missing", Visibility::Private).unwrap_err().is_not_found());
}

#[test]
fn visibility_change_on_own_method_copies_it() {
    let (ctx, object) = runtime();
    let dog = ctx.define_class(Some("Dog"), object).unwrap();
    def(&ctx, dog, "speak", "dog");
    ctx.set_method_visibility(dog, "speak", Visibility::Protected).unwrap();

    let member = ctx.require_method(dog, "speak", VisibilityContext::All).unwrap();
    assert_eq!(member.visibility(), Visibility::Protected);
    assert_eq!(tag_of(&member), "dog");
}

#[test]
fn aliases_keep_the_old_body() {
    let (ctx, object) = runtime();
    let animal = ctx.define_class(Some("Animal"), object).unwrap();
    let dog = ctx.define_class(Some("Dog"), animal).unwrap();
    def(&ctx, animal, "speak", "animal");

    let alias = ctx.alias_method(dog, "talk", "speak").unwrap();
    assert_eq!(alias.owner(), dog);
    def(&ctx, animal, "speak", "louder");
    assert_eq!(resolved(&ctx, dog, "talk"), Some("animal"));
    assert_eq!(resolved(&ctx, dog, "speak"), Some("louder"));

    assert!(ctx.alias_method(dog, "x", "missing").unwrap_err().is_not_found());
}

#[test]
fn super_resolution_continues_past_the_current_owner() {
    let (ctx, object) = runtime();
    let animal = ctx.define_class(Some("Animal"), object).unwrap();
    let dog = ctx.define_class(Some("Dog"), animal).unwrap();
    let loud = ctx.define_module(Some("Loud")).unwrap();
    ctx.include_modules(dog, &[loud]).unwrap();
    def(&ctx, animal, "speak", "animal");
    def(&ctx, loud, "speak", "loud");
    def(&ctx, dog, "speak", "dog");

    let from_dog = ctx.resolve_super_method(dog, "speak", dog).unwrap();
    assert_eq!(from_dog.member().map(|m| tag_of(m)), Some("loud"));
    let from_loud = ctx.resolve_super_method(dog, "speak", loud).unwrap();
    assert_eq!(from_loud.member().map(|m| tag_of(m)), Some("animal"));
    assert!(ctx.resolve_super_method(dog, "speak", animal).unwrap().is_not_found());
}

#[test]
fn frozen_modules_reject_definitions() {
    let (ctx, object) = runtime();
    let dog = ctx.define_class(Some("Dog"), object).unwrap();
    ctx.freeze_module(dog).unwrap();
    assert!(ctx.is_module_frozen(dog).unwrap());

    let err = ctx
        .define_method(dog, "bark", common::body("dog"), Visibility::Public, ctx.id())
        .unwrap_err();
    assert!(matches!(err, RuntimeError::FrozenModule(_)));
    assert!(resolved(&ctx, dog, "bark").is_none());
}
