use syn::{Field, FieldsNamed, Token, punctuated::Punctuated};

fn field_name_is(field: &Field, name: &str) -> bool {
    field.ident.as_ref().map(|i| i == name).unwrap_or(false)
}

/// 确保具名字段结构体包含所需字段，并按给定顺序置于最前
/// - 已存在的同名字段会被复用（保留用户的定义与属性）；
/// - 缺失的字段使用 `required` 中给出的定义补齐；
/// - 其余字段保持原有相对顺序。
pub(crate) fn ensure_required_fields(fields_named: &mut FieldsNamed, required: Vec<Field>) {
    let old_named = fields_named.named.clone();
    let mut new_named: Punctuated<Field, Token![,]> = Punctuated::new();

    let required_names: Vec<String> = required
        .iter()
        .filter_map(|f| f.ident.as_ref().map(|i| i.to_string()))
        .collect();

    for field in required.into_iter() {
        let name = field
            .ident
            .as_ref()
            .map(|i| i.to_string())
            .unwrap_or_default();
        match old_named.iter().find(|f| field_name_is(f, &name)) {
            Some(existing) => new_named.push(existing.clone()),
            None => new_named.push(field),
        }
    }

    for f in old_named.into_iter() {
        if !required_names.iter().any(|n| field_name_is(&f, n)) {
            new_named.push(f);
        }
    }

    fields_named.named = new_named;
}
