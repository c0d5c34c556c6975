// cms.rs - detached CMS SignedData creation and verification
//
// The encapsulated content is always id-data without eContent: the signed
// bytes are supplied separately as a stream. Every signer carries signed
// attributes, and its RSA PKCS#1 v1.5 signature covers their DER SET OF
// encoding.

use std::io::Read;
use std::time::SystemTime;

use cms::cert::{CertificateChoices, IssuerAndSerialNumber};
use cms::content_info::{CmsVersion, ContentInfo};
use cms::signed_data::{
    CertificateSet, EncapsulatedContentInfo, SignedAttributes, SignedData, SignerIdentifier,
    SignerInfo, SignerInfos,
};
use der::asn1::{GeneralizedTime, OctetString, SetOfVec, UtcTime};
use der::oid::ObjectIdentifier;
use der::{Any, DateTime, Decode, DecodeOwned, Encode};
use log::debug;
use x509_cert::attr::Attribute;
use x509_cert::spki::AlgorithmIdentifierOwned;
use x509_cert::time::Time;
use x509_cert::Certificate;

use super::error::{CmsError, CryptoError};
use super::keys::{self, describe, SigningIdentity};
use super::store::TrustStore;
use super::{rsa_signature_digest, RSA_ENCRYPTION};
use crate::hash::{self, DigestAlgorithm};

pub const ID_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.1");
pub const ID_SIGNED_DATA: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.7.2");
pub const ID_CONTENT_TYPE: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.3");
pub const ID_MESSAGE_DIGEST: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.4");
pub const ID_SIGNING_TIME: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.5");

/// Digest used for new signatures.
pub const SIGNING_DIGEST: DigestAlgorithm = DigestAlgorithm::Sha256;

/// Checks to skip during [`DetachedSignature::verify`].
#[derive(Debug, Clone, Copy, Default)]
pub struct VerifyFlags {
    /// Do not chain-validate signer certificates against the trust store.
    pub no_signer_cert_verify: bool,
    /// Only resolve signers; skip the signature and content digest checks.
    pub no_content_verify: bool,
}

/// A decoded or freshly created detached signature.
#[derive(Debug, Clone)]
pub struct DetachedSignature {
    signed_data: SignedData,
}

impl DetachedSignature {
    /// Sign a precomputed [`SIGNING_DIGEST`] of the content.
    ///
    /// Each identity contributes one signer. `certificates` are embedded
    /// as-is (duplicates removed); pass an empty slice for a signature that
    /// carries no certificates.
    pub fn sign_digest(
        digest: &[u8],
        identities: &[SigningIdentity],
        certificates: &[Certificate],
    ) -> Result<Self, CryptoError> {
        Self::sign_digest_at(digest, identities, certificates, SystemTime::now())
    }

    fn sign_digest_at(
        digest: &[u8],
        identities: &[SigningIdentity],
        certificates: &[Certificate],
        now: SystemTime,
    ) -> Result<Self, CryptoError> {
        if identities.is_empty() {
            return Err(CryptoError::NotFound("signing identity"));
        }

        let signing_time = signing_time(now)?;
        let mut signer_infos = Vec::with_capacity(identities.len());
        for identity in identities {
            let attrs: SignedAttributes = SetOfVec::try_from(vec![
                attribute(ID_CONTENT_TYPE, Any::encode_from(&ID_DATA)?)?,
                attribute(ID_MESSAGE_DIGEST, Any::encode_from(&OctetString::new(digest)?)?)?,
                attribute(ID_SIGNING_TIME, Any::encode_from(&signing_time)?)?,
            ])?;
            let signature = identity.key.sign(SIGNING_DIGEST, &attrs.to_der()?)?;

            let tbs = &identity.certificate.tbs_certificate;
            signer_infos.push(SignerInfo {
                version: CmsVersion::V1,
                sid: SignerIdentifier::IssuerAndSerialNumber(IssuerAndSerialNumber {
                    issuer: tbs.issuer.clone(),
                    serial_number: tbs.serial_number.clone(),
                }),
                digest_alg: AlgorithmIdentifierOwned {
                    oid: SIGNING_DIGEST.oid(),
                    parameters: None,
                },
                signed_attrs: Some(attrs),
                signature_algorithm: AlgorithmIdentifierOwned {
                    oid: RSA_ENCRYPTION,
                    parameters: Some(Any::null()),
                },
                signature: OctetString::new(signature)?,
                unsigned_attrs: None,
            });
            debug!(
                "signed as '{}' ({})",
                describe(&identity.certificate),
                keys::fingerprint(&identity.certificate)
            );
        }

        let mut unique: Vec<&Certificate> = Vec::new();
        for cert in certificates {
            if !unique.contains(&cert) {
                unique.push(cert);
            }
        }
        let certificates = if unique.is_empty() {
            None
        } else {
            let choices = unique
                .into_iter()
                .map(|cert| CertificateChoices::Certificate(cert.clone()))
                .collect::<Vec<_>>();
            Some(CertificateSet(SetOfVec::try_from(choices)?))
        };

        let signed_data = SignedData {
            version: CmsVersion::V1,
            digest_algorithms: SetOfVec::try_from(vec![AlgorithmIdentifierOwned {
                oid: SIGNING_DIGEST.oid(),
                parameters: None,
            }])?,
            encap_content_info: EncapsulatedContentInfo {
                econtent_type: ID_DATA,
                econtent: None,
            },
            certificates,
            crls: None,
            signer_infos: SignerInfos(SetOfVec::try_from(signer_infos)?),
        };
        Ok(Self { signed_data })
    }

    /// Parse a DER `ContentInfo` holding `SignedData`.
    pub fn from_der(bytes: &[u8]) -> Result<Self, CmsError> {
        let info = ContentInfo::from_der(bytes)?;
        if info.content_type != ID_SIGNED_DATA {
            return Err(CmsError::NotSignedData);
        }
        let signed_data = SignedData::from_der(&info.content.to_der()?)?;
        if signed_data.signer_infos.0.is_empty() {
            return Err(CmsError::NoSigners);
        }
        Ok(Self { signed_data })
    }

    pub fn to_der(&self) -> Result<Vec<u8>, CryptoError> {
        let info = ContentInfo {
            content_type: ID_SIGNED_DATA,
            content: Any::encode_from(&self.signed_data)?,
        };
        Ok(info.to_der()?)
    }

    /// Certificates embedded in the signature.
    pub fn certificates(&self) -> Vec<Certificate> {
        self.signed_data
            .certificates
            .iter()
            .flat_map(|set| set.0.iter())
            .filter_map(|choice| match choice {
                CertificateChoices::Certificate(cert) => Some(cert.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn signer_count(&self) -> usize {
        self.signed_data.signer_infos.0.len()
    }

    /// Verify the signature against the detached `content`.
    ///
    /// Every signer must resolve to a certificate in `signers`; embedded
    /// certificates are only used as untrusted intermediates and may not
    /// contradict a resolved signer. All signers must pass every enabled
    /// check.
    pub fn verify<R: Read>(
        &self,
        content: R,
        signers: &[Certificate],
        store: &TrustStore,
        flags: VerifyFlags,
    ) -> Result<(), CmsError> {
        let embedded = self.certificates();

        let mut resolved = Vec::with_capacity(self.signer_count());
        for info in self.signed_data.signer_infos.0.iter() {
            resolved.push((info, resolve_signer(&info.sid, signers, &embedded)?));
        }

        if !flags.no_signer_cert_verify {
            for (_, cert) in &resolved {
                store.validate(cert, &embedded)?;
            }
        }

        if flags.no_content_verify {
            debug!("resolved {} signer(s), content not checked", resolved.len());
            return Ok(());
        }

        let mut expected = Vec::with_capacity(resolved.len());
        for (info, cert) in &resolved {
            expected.push(self.check_signer_info(info, cert)?);
        }

        let mut algorithms: Vec<DigestAlgorithm> = Vec::new();
        for (algorithm, _) in &expected {
            if !algorithms.contains(algorithm) {
                algorithms.push(*algorithm);
            }
        }
        let computed: Vec<(DigestAlgorithm, Vec<u8>)> = algorithms
            .iter()
            .copied()
            .zip(hash::digest_reader(content, &algorithms)?)
            .collect();

        for (algorithm, signed) in &expected {
            if !computed.iter().any(|(a, d)| a == algorithm && d == signed) {
                return Err(CmsError::DigestMismatch);
            }
        }
        debug!("content digest matches for {} signer(s)", expected.len());
        Ok(())
    }

    /// Check one signer's attributes and signature; returns the digest it
    /// signed.
    fn check_signer_info(
        &self,
        info: &SignerInfo,
        cert: &Certificate,
    ) -> Result<(DigestAlgorithm, Vec<u8>), CmsError> {
        let algorithm = DigestAlgorithm::from_oid(info.digest_alg.oid)?;
        let sig_oid = info.signature_algorithm.oid;
        if sig_oid != RSA_ENCRYPTION && rsa_signature_digest(sig_oid)? != algorithm {
            return Err(CmsError::AlgorithmMismatch);
        }

        let attrs = info
            .signed_attrs
            .as_ref()
            .ok_or(CmsError::Attribute("signedAttrs"))?;
        let content_type: ObjectIdentifier =
            single_attribute(attrs, ID_CONTENT_TYPE, "contentType")?;
        if content_type != self.signed_data.encap_content_info.econtent_type {
            return Err(CmsError::ContentTypeMismatch);
        }
        let digest: OctetString = single_attribute(attrs, ID_MESSAGE_DIGEST, "messageDigest")?;

        keys::public_key(cert)?
            .verify(
                algorithm.pkcs1v15(),
                &algorithm.digest(&attrs.to_der()?),
                info.signature.as_bytes(),
            )
            .map_err(|_| CmsError::BadSignature(describe(cert)))?;

        Ok((algorithm, digest.as_bytes().to_vec()))
    }
}

/// UTCTime through 2049, GeneralizedTime from 2050 on.
fn signing_time(now: SystemTime) -> Result<Time, CryptoError> {
    let datetime = DateTime::from_system_time(now)?;
    Ok(match UtcTime::from_date_time(datetime) {
        Ok(utc) => Time::UtcTime(utc),
        Err(_) => Time::GeneralTime(GeneralizedTime::from_date_time(datetime)),
    })
}

fn attribute(oid: ObjectIdentifier, value: Any) -> Result<Attribute, CryptoError> {
    Ok(Attribute {
        oid,
        values: SetOfVec::try_from(vec![value])?,
    })
}

/// Decode the only value of the only attribute with `oid`.
fn single_attribute<T: DecodeOwned>(
    attrs: &SignedAttributes,
    oid: ObjectIdentifier,
    name: &'static str,
) -> Result<T, CmsError> {
    let mut matching = attrs.iter().filter(|attr| attr.oid == oid);
    let (Some(attr), None) = (matching.next(), matching.next()) else {
        return Err(CmsError::Attribute(name));
    };
    let mut values = attr.values.iter();
    let (Some(value), None) = (values.next(), values.next()) else {
        return Err(CmsError::Attribute(name));
    };
    T::from_der(&value.to_der()?).map_err(|_| CmsError::Attribute(name))
}

fn resolve_signer<'a>(
    sid: &SignerIdentifier,
    signers: &'a [Certificate],
    embedded: &[Certificate],
) -> Result<&'a Certificate, CmsError> {
    let cert = signers
        .iter()
        .find(|cert| matches_sid(cert, sid))
        .ok_or_else(|| CmsError::UnknownSigner(describe_sid(sid)))?;
    if embedded
        .iter()
        .any(|other| matches_sid(other, sid) && other != cert)
    {
        return Err(CmsError::EmbeddedCertificateMismatch(describe(cert)));
    }
    Ok(cert)
}

fn matches_sid(cert: &Certificate, sid: &SignerIdentifier) -> bool {
    match sid {
        SignerIdentifier::IssuerAndSerialNumber(isn) => {
            cert.tbs_certificate.issuer == isn.issuer
                && cert.tbs_certificate.serial_number == isn.serial_number
        }
        SignerIdentifier::SubjectKeyIdentifier(ski) => {
            matches!(keys::subject_key_identifier(cert), Ok(Some(own)) if own == *ski)
        }
    }
}

fn describe_sid(sid: &SignerIdentifier) -> String {
    match sid {
        SignerIdentifier::IssuerAndSerialNumber(isn) => format!(
            "{} serial {}",
            isn.issuer,
            hash::hex_encode(isn.serial_number.as_bytes())
        ),
        SignerIdentifier::SubjectKeyIdentifier(ski) => {
            format!("key id {}", hash::hex_encode(ski.0.as_bytes()))
        }
    }
}
