#![allow(dead_code)]

use std::sync::Arc;

use rb_runtime::{MemberInfo, MethodBody, ModuleId, RuntimeContext, Visibility, VisibilityContext};

pub fn runtime() -> (RuntimeContext, ModuleId) {
    let ctx = RuntimeContext::default();
    let object = ctx.define_root_class("Object").unwrap();
    (ctx, object)
}

pub fn body(tag: &'static str) -> MethodBody {
    Arc::new(tag)
}

pub fn def(ctx: &RuntimeContext, id: ModuleId, name: &str, tag: &'static str) -> Arc<MemberInfo> {
    def_with(ctx, id, name, tag, Visibility::Public)
}

pub fn def_with(
    ctx: &RuntimeContext,
    id: ModuleId,
    name: &str,
    tag: &'static str,
    visibility: Visibility,
) -> Arc<MemberInfo> {
    ctx.define_method(id, name, body(tag), visibility, ctx.id()).unwrap()
}

pub fn tag_of(member: &MemberInfo) -> &'static str {
    *member.body_as::<&'static str>().unwrap()
}

/// Tag of the body `name` resolves to on `id`, or `None` when it does not
/// resolve.
pub fn resolved(ctx: &RuntimeContext, id: ModuleId, name: &str) -> Option<&'static str> {
    ctx.resolve_method(id, name, VisibilityContext::All)
        .unwrap()
        .member()
        .map(|m| tag_of(m))
}
