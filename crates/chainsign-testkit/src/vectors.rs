//! Scenario vectors for behavioral verification.
//!
//! Each vector is a scripted sequence of calls with the outcome every
//! implementation must produce. Parties and documents are named by labels
//! and mapped to identities and hashes deterministically, so a vector means
//! the same thing on every backend.

use anyhow::{bail, ensure, Context};

use chainsign::{Notary, NotaryError};
use chainsign_core::{
    Cid, DocumentHash, Endorsement, Identity, Ledger, RegisterError, SignError, SignRequest,
    Signatory,
};
use chainsign_store::Store;

/// Expected outcome of a mutating step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    Accepted,
    AlreadyRegistered,
    SignatoryNotRegistered,
    ChildAlreadyLinked,
    AlreadySigned,
}

impl Expect {
    fn of_register(result: &Result<Signatory, RegisterError>) -> Self {
        match result {
            Ok(_) => Expect::Accepted,
            Err(RegisterError::AlreadyRegistered(_)) => Expect::AlreadyRegistered,
        }
    }

    fn of_sign(result: &Result<Endorsement, SignError>) -> Self {
        match result {
            Ok(_) => Expect::Accepted,
            Err(SignError::SignatoryNotRegistered(_)) => Expect::SignatoryNotRegistered,
            Err(SignError::ChildAlreadyLinked(_)) => Expect::ChildAlreadyLinked,
            Err(SignError::AlreadySigned { .. }) => Expect::AlreadySigned,
        }
    }
}

/// One step of a scenario.
#[derive(Debug, Clone)]
pub enum Step {
    Register {
        party: &'static str,
        cid: &'static str,
        expect: Expect,
    },
    Sign {
        child: &'static str,
        parent: &'static str,
        signer: &'static str,
        expect: Expect,
    },
    ExpectCid {
        party: &'static str,
        cid: Option<&'static str>,
    },
    ExpectEndorsers {
        doc: &'static str,
        endorsers: &'static [&'static str],
    },
    ExpectRoot {
        doc: &'static str,
        root: &'static str,
    },
}

/// A scenario vector.
#[derive(Debug, Clone)]
pub struct ScenarioVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// What the vector demonstrates.
    pub description: &'static str,
    pub steps: Vec<Step>,
}

/// The identity a party label stands for.
pub fn party(label: &str) -> Identity {
    Identity::derive(label.as_bytes())
}

/// The document hash a label stands for.
pub fn document(label: &str) -> DocumentHash {
    DocumentHash::digest(label.as_bytes())
}

fn register(party: &'static str, cid: &'static str) -> Step {
    Step::Register {
        party,
        cid,
        expect: Expect::Accepted,
    }
}

fn sign(child: &'static str, parent: &'static str, signer: &'static str, expect: Expect) -> Step {
    Step::Sign {
        child,
        parent,
        signer,
        expect,
    }
}

fn endorsers(doc: &'static str, endorsers: &'static [&'static str]) -> Step {
    Step::ExpectEndorsers { doc, endorsers }
}

fn root(doc: &'static str, root: &'static str) -> Step {
    Step::ExpectRoot { doc, root }
}

/// Get all scenario vectors.
pub fn all_vectors() -> Vec<ScenarioVector> {
    use Expect::*;

    vec![
        ScenarioVector {
            name: "register-then-lookup",
            description: "a registered cid is returned by lookup",
            steps: vec![
                register("X", "123456789abcdef"),
                Step::ExpectCid {
                    party: "X",
                    cid: Some("123456789abcdef"),
                },
                Step::ExpectCid {
                    party: "Y",
                    cid: None,
                },
            ],
        },
        ScenarioVector {
            name: "self-signed-root",
            description: "signing a fresh hash as its own parent starts a chain",
            steps: vec![
                register("X", "cid-x"),
                sign("H1", "H1", "X", Accepted),
                endorsers("H1", &["X"]),
                root("H1", "H1"),
            ],
        },
        ScenarioVector {
            name: "two-signers-one-chain",
            description: "signing from a child lands on the same root and list",
            steps: vec![
                register("X", "cid-x"),
                register("Y", "cid-y"),
                sign("H1", "O", "X", Accepted),
                sign("H2", "H1", "Y", Accepted),
                endorsers("H1", &["X", "Y"]),
                endorsers("O", &["X", "Y"]),
                endorsers("H2", &["X", "Y"]),
                root("H2", "O"),
            ],
        },
        ScenarioVector {
            name: "repeat-signer-rejected",
            description: "one signature per identity per chain",
            steps: vec![
                register("X", "cid-x"),
                sign("H1", "O", "X", Accepted),
                sign("H2", "O", "X", AlreadySigned),
                endorsers("O", &["X"]),
                root("H2", "H2"),
            ],
        },
        ScenarioVector {
            name: "reused-child-rejected",
            description: "a hash can be used as a child only once",
            steps: vec![
                register("X", "cid-x"),
                register("Y", "cid-y"),
                sign("H1", "O", "X", Accepted),
                sign("H1", "O", "Y", ChildAlreadyLinked),
                endorsers("O", &["X"]),
            ],
        },
        ScenarioVector {
            name: "unregistered-signer-rejected",
            description: "an unregistered caller changes nothing",
            steps: vec![
                register("X", "cid-x"),
                sign("H1", "O", "X", Accepted),
                sign("H2", "O", "Z", SignatoryNotRegistered),
                endorsers("O", &["X"]),
                root("H2", "H2"),
            ],
        },
        ScenarioVector {
            name: "duplicate-registration-rejected",
            description: "the first cid registered for an identity is permanent",
            steps: vec![
                register("X", "first"),
                Step::Register {
                    party: "X",
                    cid: "second",
                    expect: AlreadyRegistered,
                },
                Step::ExpectCid {
                    party: "X",
                    cid: Some("first"),
                },
            ],
        },
        ScenarioVector {
            name: "check-order",
            description: "registration is checked before linkage, linkage before repeat signing",
            steps: vec![
                register("X", "cid-x"),
                sign("H1", "O", "X", Accepted),
                sign("H1", "O", "Z", SignatoryNotRegistered),
                sign("H1", "O", "X", ChildAlreadyLinked),
                endorsers("O", &["X"]),
            ],
        },
        ScenarioVector {
            name: "self-link-is-a-child",
            description: "a self-signed root cannot later be linked elsewhere",
            steps: vec![
                register("X", "cid-x"),
                register("Y", "cid-y"),
                sign("H", "H", "X", Accepted),
                sign("H2", "H", "Y", Accepted),
                sign("H", "O", "Y", ChildAlreadyLinked),
                endorsers("H2", &["X", "Y"]),
                root("H2", "H"),
            ],
        },
        ScenarioVector {
            name: "former-root-becomes-child",
            description: "a root linked under another chain resolves through to the new root",
            steps: vec![
                register("X", "cid-x"),
                register("Y", "cid-y"),
                register("Z", "cid-z"),
                sign("C1", "R", "X", Accepted),
                sign("R", "P", "Y", Accepted),
                root("C1", "P"),
                endorsers("C1", &["Y"]),
                sign("C2", "C1", "Z", Accepted),
                sign("C3", "C1", "X", Accepted),
                endorsers("R", &["Y", "Z", "X"]),
                root("C3", "P"),
            ],
        },
        ScenarioVector {
            name: "unknown-hash",
            description: "a hash nobody signed is its own root with no endorsers",
            steps: vec![endorsers("never-seen", &[]), root("never-seen", "never-seen")],
        },
    ]
}

/// Run a vector against a fresh reference ledger.
pub fn run_on_ledger(vector: &ScenarioVector) -> anyhow::Result<Ledger> {
    let mut ledger = Ledger::new();

    for (index, step) in vector.steps.iter().enumerate() {
        let at = || format!("{} step {}", vector.name, index);
        match *step {
            Step::Register {
                party: label,
                cid,
                expect,
            } => {
                let cid = Cid::try_from(cid).with_context(at)?;
                let got = Expect::of_register(&ledger.register(party(label), cid));
                ensure!(got == expect, "{}: got {:?}, expected {:?}", at(), got, expect);
            }
            Step::Sign {
                child,
                parent,
                signer,
                expect,
            } => {
                let request = SignRequest::new(document(child), document(parent), party(signer));
                let got = Expect::of_sign(&ledger.sign(&request));
                ensure!(got == expect, "{}: got {:?}, expected {:?}", at(), got, expect);
            }
            Step::ExpectCid { party: label, cid } => {
                let got = ledger.lookup_cid(&party(label)).and_then(Cid::as_str);
                ensure!(got == cid, "{}: cid {:?}, expected {:?}", at(), got, cid);
            }
            Step::ExpectEndorsers { doc, endorsers } => {
                let expected: Vec<Identity> = endorsers.iter().map(|label| party(label)).collect();
                let got = ledger.endorsers_of(&document(doc));
                ensure!(got == expected.as_slice(), "{}: endorsers of {} differ", at(), doc);
            }
            Step::ExpectRoot { doc, root } => {
                let got = ledger.root_of(&document(doc));
                ensure!(got == document(root), "{}: {} has root {}", at(), doc, got);
            }
        }
    }

    Ok(ledger)
}

/// Run a vector against `notary`, which should start empty.
pub async fn run_on_notary<S: Store>(
    notary: &Notary<S>,
    vector: &ScenarioVector,
) -> anyhow::Result<()> {
    for (index, step) in vector.steps.iter().enumerate() {
        let at = || format!("{} step {}", vector.name, index);
        match *step {
            Step::Register {
                party: label,
                cid,
                expect,
            } => {
                let cid = Cid::try_from(cid).with_context(at)?;
                let result = match notary.register(party(label), cid).await {
                    Ok(signatory) => Ok(signatory),
                    Err(NotaryError::Register(e)) => Err(e),
                    Err(e) => bail!("{}: {}", at(), e),
                };
                let got = Expect::of_register(&result);
                ensure!(got == expect, "{}: got {:?}, expected {:?}", at(), got, expect);
            }
            Step::Sign {
                child,
                parent,
                signer,
                expect,
            } => {
                let result = match notary
                    .sign(document(child), document(parent), party(signer))
                    .await
                {
                    Ok(endorsement) => Ok(endorsement),
                    Err(NotaryError::Sign(e)) => Err(e),
                    Err(e) => bail!("{}: {}", at(), e),
                };
                let got = Expect::of_sign(&result);
                ensure!(got == expect, "{}: got {:?}, expected {:?}", at(), got, expect);
            }
            Step::ExpectCid { party: label, cid } => {
                let got = notary.lookup_cid(&party(label)).await.with_context(at)?;
                let got = got.as_ref().and_then(Cid::as_str);
                ensure!(got == cid, "{}: cid {:?}, expected {:?}", at(), got, cid);
            }
            Step::ExpectEndorsers { doc, endorsers } => {
                let expected: Vec<Identity> = endorsers.iter().map(|label| party(label)).collect();
                let got = notary.endorsers_of(&document(doc)).await.with_context(at)?;
                ensure!(got == expected, "{}: endorsers of {} differ", at(), doc);
            }
            Step::ExpectRoot { doc, root } => {
                let got = notary.root_of(&document(doc)).await.with_context(at)?;
                ensure!(got == document(root), "{}: {} has root {}", at(), doc, got);
            }
        }
    }

    Ok(())
}

/// Run every vector against the reference ledger.
///
/// Returns each vector's name with its failure, if any.
pub fn verify_all_vectors() -> Vec<(&'static str, Option<String>)> {
    all_vectors()
        .iter()
        .map(|v| (v.name, run_on_ledger(v).err().map(|e| format!("{:#}", e))))
        .collect()
}
