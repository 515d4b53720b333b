//! Contact list membership operations.

use crate::model::contact::{Contact, ContactList, ContactListMember, CreateContactListMemberData};
use crate::model::{Entity, RecordId};
use crate::repo::filter::Filter;
use crate::repo::record_store::RecordStore;
use crate::service::error::{FacadeError, FacadeResult};
use crate::service::facade::{load_required, log_outcome, RecordFacade};

impl<S: RecordStore> RecordFacade<S> {
    /// Adds a contact to a list.
    ///
    /// # Errors
    /// - `Validation` when either side is unknown under `user_id`.
    /// - `Conflict` when the contact is already a member.
    pub fn add_contact_to_list(
        &self,
        user_id: &str,
        contact_list_id: RecordId,
        contact_id: RecordId,
    ) -> FacadeResult<ContactListMember> {
        self.create::<ContactListMember>(
            user_id,
            CreateContactListMemberData {
                contact_list_id,
                contact_id,
            },
        )
    }

    /// Removes a contact from a list; `NotMember` when it was not in it.
    pub fn remove_contact_from_list(
        &self,
        user_id: &str,
        contact_list_id: RecordId,
        contact_id: RecordId,
    ) -> FacadeResult<()> {
        let result: FacadeResult<()> = self.store().atomically(|store| {
            let filter = Filter::new()
                .eq("contact_list_id", contact_list_id.to_string())
                .eq("contact_id", contact_id.to_string());
            let member = store
                .query::<ContactListMember>(user_id, &filter)?
                .into_iter()
                .next()
                .ok_or(FacadeError::NotMember {
                    contact_list_id,
                    contact_id,
                })?;
            store.delete::<ContactListMember>(user_id, member.id)?;
            Ok(())
        });
        log_outcome("member_remove", ContactListMember::KIND, &result);
        result
    }

    /// Membership rows of one list, oldest first.
    pub fn list_members(
        &self,
        user_id: &str,
        contact_list_id: RecordId,
    ) -> FacadeResult<Vec<ContactListMember>> {
        load_required::<S, ContactList>(self.store(), user_id, contact_list_id)?;
        self.list(
            user_id,
            &Filter::new().eq("contact_list_id", contact_list_id.to_string()),
        )
    }

    /// Contacts of one list, in the order they were added.
    pub fn list_contacts_in_list(
        &self,
        user_id: &str,
        contact_list_id: RecordId,
    ) -> FacadeResult<Vec<Contact>> {
        let members = self.list_members(user_id, contact_list_id)?;
        let mut contacts = Vec::with_capacity(members.len());
        for member in members {
            if let Some(contact) = self.store().get::<Contact>(user_id, member.contact_id)? {
                contacts.push(contact);
            }
        }
        Ok(contacts)
    }
}
