//! Editing triples through the roles of document nodes.
//!
//! The same resource may be defined by several nodes; commands update all of
//! them. Link properties (objects naming another node) are mirrored by a
//! backlink on each target, and every command keeps that mirror exact: a
//! target carries one backlink per `(subject, predicate)` that links to it.
//!
//! Commands take the caller's [`Transaction`] so several of them form a
//! single edit, and return `Ok(false)` when their subject or target does
//! not exist.

use crate::Error;
use crate::mapping::Bias;
use crate::model::{Document, Element, Fragment, NodeId};
use crate::operations::{InsertOperation, MoveOperation};
use crate::position::Range;
use crate::rdfa::attrs::{
    IncomingTriple, LiteralAttrs, OutgoingTriple, RdfaAttrs, ResourceAttrs, Term,
};
use crate::rdfa::projection::{fresh_node_id, sync_element};
use crate::transaction::Transaction;

fn role(doc: &Document, id: NodeId) -> Option<&RdfaAttrs> {
    doc.element(id)?.rdfa.as_ref()
}

/// Resource nodes whose subject is `subject`, in document order.
pub fn resource_nodes(doc: &Document, subject: &str) -> Vec<NodeId> {
    doc.rdfa_nodes()
        .filter(|&id| role(doc, id).and_then(RdfaAttrs::subject) == Some(subject))
        .collect()
}

/// Nodes a link term points at.
pub fn link_targets(doc: &Document, term: &Term) -> Vec<NodeId> {
    if !term.is_link() {
        return Vec::new();
    }
    doc.rdfa_nodes()
        .filter(|&id| role(doc, id).is_some_and(|r| r.is_target_of(term)))
        .collect()
}

fn mirror(subject: &str, predicate: &str) -> IncomingTriple {
    IncomingTriple::new(Term::resource_node(subject), predicate)
}

/// Whether some node of `subject` still links to `object` via `predicate`.
fn still_linked(doc: &Document, subject: &str, predicate: &str, object: &Term) -> bool {
    resource_nodes(doc, subject).into_iter().any(|id| {
        role(doc, id)
            .and_then(RdfaAttrs::as_resource)
            .is_some_and(|r| {
                r.properties
                    .iter()
                    .any(|p| p.predicate == predicate && p.object == *object)
            })
    })
}

fn add_backlink(
    tx: &mut Transaction<'_>,
    target: NodeId,
    backlink: &IncomingTriple,
) -> Result<(), Error> {
    tx.update_role(target, |role| {
        let backlinks = role.backlinks_mut();
        if !backlinks.contains(backlink) {
            backlinks.push(backlink.clone());
        }
    })?;
    Ok(())
}

fn drop_backlink(
    tx: &mut Transaction<'_>,
    target: NodeId,
    backlink: &IncomingTriple,
) -> Result<(), Error> {
    tx.update_role(target, |role| role.backlinks_mut().retain(|b| b != backlink))?;
    Ok(())
}

pub fn add_property(
    tx: &mut Transaction<'_>,
    subject: &str,
    triple: OutgoingTriple,
) -> Result<bool, Error> {
    let nodes = resource_nodes(tx.doc(), subject);
    if nodes.is_empty() {
        tracing::debug!(subject, "no node defines subject");
        return Ok(false);
    }
    for id in nodes {
        tx.update_role(id, |role| {
            if let Some(resource) = role.as_resource_mut() {
                if !resource.properties.contains(&triple) {
                    resource.properties.push(triple.clone());
                }
            }
        })?;
    }

    let backlink = mirror(subject, &triple.predicate);
    for target in link_targets(tx.doc(), &triple.object) {
        add_backlink(tx, target, &backlink)?;
    }
    Ok(true)
}

/// Removes the property at `index` of the first node defining `subject`
/// from every node defining it.
pub fn remove_property(
    tx: &mut Transaction<'_>,
    subject: &str,
    index: usize,
) -> Result<bool, Error> {
    let triple = resource_nodes(tx.doc(), subject)
        .first()
        .and_then(|&id| role(tx.doc(), id))
        .and_then(RdfaAttrs::as_resource)
        .and_then(|r| r.properties.get(index).cloned());
    match triple {
        Some(triple) => remove_property_by_value(tx, subject, &triple),
        None => Ok(false),
    }
}

pub fn remove_property_by_value(
    tx: &mut Transaction<'_>,
    subject: &str,
    triple: &OutgoingTriple,
) -> Result<bool, Error> {
    let mut removed = false;
    for id in resource_nodes(tx.doc(), subject) {
        let found = tx.update_role(id, |role| {
            let Some(resource) = role.as_resource_mut() else {
                return false;
            };
            match resource.properties.iter().position(|p| p == triple) {
                Some(i) => {
                    resource.properties.remove(i);
                    true
                }
                None => false,
            }
        })?;
        removed |= found == Some(true);
    }
    if !removed {
        return Ok(false);
    }

    if !still_linked(tx.doc(), subject, &triple.predicate, &triple.object) {
        let backlink = mirror(subject, &triple.predicate);
        for target in link_targets(tx.doc(), &triple.object) {
            drop_backlink(tx, target, &backlink)?;
        }
    }
    Ok(true)
}

/// Removes backlink `index` of `target` together with the property that
/// produced it. Every property matching both the predicate and the
/// originating subject goes; other links to the same target stay.
pub fn remove_backlink(
    tx: &mut Transaction<'_>,
    target: NodeId,
    index: usize,
) -> Result<bool, Error> {
    let Some(target_role) = role(tx.doc(), target).cloned() else {
        return Ok(false);
    };
    let Some(backlink) = target_role.backlinks().get(index).cloned() else {
        return Ok(false);
    };
    tx.update_role(target, |role| {
        role.backlinks_mut().remove(index);
    })?;

    let Some(subject) = backlink.subject.value().map(str::to_string) else {
        return Ok(true);
    };
    for id in resource_nodes(tx.doc(), &subject) {
        tx.update_role(id, |role| {
            if let Some(resource) = role.as_resource_mut() {
                resource.properties.retain(|p| {
                    p.predicate != backlink.predicate || !target_role.is_target_of(&p.object)
                });
            }
        })?;
    }

    // other nodes defining the same target resource carry the same mirror
    if let Some(target_subject) = target_role.subject() {
        let linked = resource_nodes(tx.doc(), &subject).into_iter().any(|id| {
            role(tx.doc(), id)
                .and_then(RdfaAttrs::as_resource)
                .is_some_and(|r| {
                    r.properties.iter().any(|p| {
                        p.predicate == backlink.predicate && target_role.is_target_of(&p.object)
                    })
                })
        });
        if !linked {
            for other in resource_nodes(tx.doc(), target_subject) {
                if other != target {
                    drop_backlink(tx, other, &backlink)?;
                }
            }
        }
    }
    Ok(true)
}

/// Renames the subject of a resource node. Links to the old subject follow
/// it when no other node still defines that subject.
pub fn set_subject(tx: &mut Transaction<'_>, node: NodeId, subject: &str) -> Result<bool, Error> {
    let Some(old) = role(tx.doc(), node)
        .and_then(RdfaAttrs::subject)
        .map(str::to_string)
    else {
        return Ok(false);
    };
    if old == subject {
        return Ok(true);
    }
    let properties = role(tx.doc(), node)
        .and_then(RdfaAttrs::as_resource)
        .map(|r| r.properties.clone())
        .unwrap_or_default();
    tx.update_role(node, |role| {
        if let Some(resource) = role.as_resource_mut() {
            resource.subject = subject.to_string();
        }
    })?;

    for triple in properties.iter().filter(|p| p.object.is_link()) {
        let old_mirror = mirror(&old, &triple.predicate);
        let new_mirror = mirror(subject, &triple.predicate);
        let keep_old = still_linked(tx.doc(), &old, &triple.predicate, &triple.object);
        for target in link_targets(tx.doc(), &triple.object) {
            if !keep_old {
                drop_backlink(tx, target, &old_mirror)?;
            }
            add_backlink(tx, target, &new_mirror)?;
        }
    }

    if resource_nodes(tx.doc(), &old).is_empty() {
        let old_term = Term::resource_node(old.as_str());
        let new_term = Term::resource_node(subject);
        let linking: Vec<NodeId> = tx
            .doc()
            .rdfa_nodes()
            .filter(|&id| {
                role(tx.doc(), id)
                    .and_then(RdfaAttrs::as_resource)
                    .is_some_and(|r| r.properties.iter().any(|p| p.object == old_term))
            })
            .collect();
        for id in linking {
            tx.update_role(id, |role| {
                if let Some(resource) = role.as_resource_mut() {
                    for p in resource.properties.iter_mut().filter(|p| p.object == old_term) {
                        p.object = new_term.clone();
                    }
                }
            })?;
        }
    }
    Ok(true)
}

/// Wraps a confined range in a new element carrying `role`. Returns `None`
/// when the range crosses element boundaries.
fn wrap_range(
    tx: &mut Transaction<'_>,
    range: Range,
    role: RdfaAttrs,
) -> Result<Option<NodeId>, Error> {
    if tx.doc().minimum_confined_ranges(&range)?.len() > 1 {
        tracing::warn!(%range, "range crosses element boundaries, not wrapping");
        return Ok(None);
    }
    let mut element = Element::new("span");
    element.rdfa = Some(role);
    sync_element(&mut element)?;

    let outcome = tx.apply(InsertOperation::new(
        Range::collapsed(range.start),
        vec![Fragment::from_element(element)],
    ))?;
    let wrapper = outcome
        .inserted_nodes
        .first()
        .copied()
        .ok_or_else(|| Error::Internal {
            message: format!("wrapping {range} produced no node"),
        })?;
    let end = outcome.mapper.map_position(range.end, Bias::Right);
    let from = tx.doc().node_end(wrapper)?;
    if from < end {
        let target = tx.doc().content_end(wrapper)?;
        tx.apply(MoveOperation::new(Range::new(from, end), target))?;
    }
    Ok(Some(wrapper))
}

/// Turns a range into a new resource node for `subject`, optionally linked
/// from `link = (subject, predicate)`.
pub fn wrap_resource(
    tx: &mut Transaction<'_>,
    range: Range,
    subject: &str,
    link: Option<(&str, &str)>,
) -> Result<Option<NodeId>, Error> {
    let role = RdfaAttrs::Resource(ResourceAttrs::new(fresh_node_id(), subject));
    let Some(node) = wrap_range(tx, range, role)? else {
        return Ok(None);
    };
    if let Some((from, predicate)) = link {
        add_property(
            tx,
            from,
            OutgoingTriple::new(predicate, Term::resource_node(subject)),
        )?;
    }
    Ok(Some(node))
}

/// Turns a range into a new literal node whose text is its value,
/// optionally linked from `link = (subject, predicate)`.
pub fn wrap_literal(
    tx: &mut Transaction<'_>,
    range: Range,
    datatype: Option<&str>,
    language: Option<&str>,
    link: Option<(&str, &str)>,
) -> Result<Option<NodeId>, Error> {
    let node_id = fresh_node_id();
    let mut literal = LiteralAttrs::new(node_id.clone());
    literal.datatype = datatype.map(str::to_string);
    literal.language = language.map(str::to_string);
    let Some(node) = wrap_range(tx, range, RdfaAttrs::Literal(literal))? else {
        return Ok(None);
    };
    if let Some((from, predicate)) = link {
        let object = Term::LiteralNode {
            value: node_id,
            datatype: datatype.map(str::to_string),
            language: language.map(str::to_string),
        };
        add_property(tx, from, OutgoingTriple::new(predicate, object))?;
    }
    Ok(Some(node))
}
