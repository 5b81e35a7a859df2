//! Turning a template and a hostname list into a batch of documents.

use crate::domain::{Batch, Template};

/// What [`build_batch`] produced.
#[derive(Debug, PartialEq)]
pub enum BuildOutcome {
    /// At least one document is ready to submit.
    Ready(Batch),
    /// There were no hostnames, so there is nothing to submit.
    NoIdentifiers,
}

/// Build one document per hostname, in order, duplicates included.
pub fn build_batch<S: AsRef<str>>(
    template: &Template,
    hostnames: &[S],
    index_name: &str,
) -> BuildOutcome {
    if hostnames.is_empty() {
        return BuildOutcome::NoIdentifiers;
    }

    let documents = hostnames
        .iter()
        .map(|hostname| template.document_for(hostname.as_ref()))
        .collect();

    BuildOutcome::Ready(Batch::new(index_name, documents))
}

#[cfg(test)]
mod tests {
    use super::{build_batch, BuildOutcome};
    use crate::domain::{HelperIndexable, Template, HOSTNAME_FIELD};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn template(value: Value) -> Template {
        match value {
            Value::Object(fields) => Template::new(fields),
            other => panic!("not an object: {}", other),
        }
    }

    fn ready(outcome: BuildOutcome) -> crate::Batch {
        match outcome {
            BuildOutcome::Ready(batch) => batch,
            BuildOutcome::NoIdentifiers => panic!("expected a batch"),
        }
    }

    #[test]
    fn no_hostnames_is_a_no_op() {
        let template = template(json!({"env": "prod"}));
        let hostnames: Vec<String> = vec![];
        assert_eq!(
            build_batch(&template, &hostnames, "sdp_amdb"),
            BuildOutcome::NoIdentifiers
        );
    }

    #[test]
    fn one_document_per_hostname_in_order() {
        let template = template(json!({"env": "prod"}));
        let batch = ready(build_batch(
            &template,
            &["host-a", "host-b", "host-a"],
            "sdp_amdb",
        ));

        assert_eq!(batch.index_name(), "sdp_amdb");
        assert_eq!(batch.len(), 3);

        let sources: Vec<Value> = batch
            .documents()
            .iter()
            .map(|doc| Value::Object(doc.fields().clone()))
            .collect();
        assert_eq!(
            sources,
            vec![
                json!({"env": "prod", "hostname": "host-a"}),
                json!({"env": "prod", "hostname": "host-b"}),
                json!({"env": "prod", "hostname": "host-a"}),
            ]
        );

        let ids: Vec<&str> = batch.documents().iter().map(|d| d.doc_id()).collect();
        assert_eq!(ids, ["host-a", "host-b", "host-a"]);
    }

    #[test]
    fn every_other_field_comes_from_the_template() {
        let template = template(json!({
            "hostname": "from-template",
            "env": "prod",
            "meta": {"rack": 4, "tags": ["db"]},
            "active": true,
            "retired": null,
        }));
        let batch = ready(build_batch(&template, &["h1", "h2"], "sdp_amdb"));

        for (doc, hostname) in batch.documents().iter().zip(["h1", "h2"]) {
            for (key, value) in doc.fields() {
                if key == HOSTNAME_FIELD {
                    assert_eq!(value, &json!(hostname));
                } else {
                    assert_eq!(Some(value), template.fields().get(key));
                }
            }
            assert_eq!(doc.fields().len(), template.fields().len());
        }
    }

    #[test]
    fn documents_do_not_share_nested_values() {
        let template = template(json!({"meta": {"tags": ["db"]}}));
        let mut batch = ready(build_batch(&template, &["h1", "h2"], "sdp_amdb"));

        batch.documents_mut()[0].fields_mut()["meta"]["tags"]
            .as_array_mut()
            .unwrap()
            .push(json!("changed"));

        assert_eq!(
            batch.documents()[0].fields()["meta"],
            json!({"tags": ["db", "changed"]})
        );
        assert_eq!(batch.documents()[1].fields()["meta"], json!({"tags": ["db"]}));
        assert_eq!(template.fields()["meta"], json!({"tags": ["db"]}));
    }
}
